//! Abstractions for generating Markdown summaries through chat-completion backends.
//!
//! Each upload results in exactly one request: a fixed system instruction plus the extracted
//! text as the user message. Both adapters talk HTTP directly via `reqwest`; there is no retry,
//! no streaming, and no partial-result fallback.

mod ollama;
mod openai;

pub use ollama::OllamaSummarizationClient;
pub use openai::OpenAiSummarizationClient;

use crate::config::{Config, SummarizationProvider, get_config};
use async_trait::async_trait;
use thiserror::Error;

pub(crate) const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub(crate) const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Prefix placed in front of the extracted text in the user message.
pub const USER_MESSAGE_PREFIX: &str = "Text to summarize: ";

/// System instruction sent with every request unless overridden by configuration.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Summarize the following text into a concise paragraph that captures the main points and essential details without losing important information.
The summary should be as short as possible while remaining clear and informative.
Use bullet points or numbered lists to organize the information if it helps to clarify the meaning.
Focus on the key facts, events, and conclusions.
Avoid including minor details or examples unless they are crucial for understanding the main ideas.
";

/// Errors surfaced while attempting summarization. All of them are fatal for the upload.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or the endpoint does not exist.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or carried no content.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// System instruction.
    pub system_prompt: String,
    /// User message carrying the text to summarize.
    pub user_message: String,
}

/// Interface implemented by text-generation backends.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Issue a single chat request and return the generated (Markdown) text.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Binds a backend to the model and system instruction used for every upload.
pub struct Summarizer {
    client: Box<dyn SummarizationClient>,
    model: String,
    system_prompt: String,
}

impl Summarizer {
    /// Wrap a client with an explicit model and system prompt.
    pub fn new(
        client: Box<dyn SummarizationClient>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Build a summarizer from the global configuration.
    pub fn from_config() -> Result<Self, SummarizationClientError> {
        let config = get_config();
        let client = get_summarization_client(config)?;
        let system_prompt = config
            .summarization_system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        Ok(Self::new(
            client,
            config.summarization_model.clone(),
            system_prompt,
        ))
    }

    /// Summarize `text`, returning the backend's Markdown verbatim.
    pub async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError> {
        let request = SummarizationRequest {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            user_message: build_user_message(text),
        };
        tracing::debug!(
            model = %request.model,
            characters = text.chars().count(),
            "Requesting summary"
        );
        self.client.generate_summary(request).await
    }
}

/// Compose the user message for a summarization request.
pub fn build_user_message(text: &str) -> String {
    format!("{USER_MESSAGE_PREFIX}{text}")
}

/// Build a summarization client for the configured provider.
pub fn get_summarization_client(
    config: &Config,
) -> Result<Box<dyn SummarizationClient>, SummarizationClientError> {
    match config.summarization_provider {
        SummarizationProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Ok(Box::new(OllamaSummarizationClient::new(base_url)?))
        }
        SummarizationProvider::OpenAI => {
            let base_url = config
                .openai_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                SummarizationClientError::ProviderUnavailable("OPENAI_API_KEY is not set".into())
            })?;
            Ok(Box::new(OpenAiSummarizationClient::new(base_url, api_key)?))
        }
    }
}

/// Reject empty or whitespace-only completions. Anything else is returned untouched, since
/// leading indentation is significant Markdown.
pub(crate) fn finish_summary(content: &str) -> Result<String, SummarizationClientError> {
    if content.trim().is_empty() {
        return Err(SummarizationClientError::InvalidResponse(
            "provider returned an empty summary".into(),
        ));
    }
    Ok(content.to_string())
}
