use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Character budget applied to extraction when `EXTRACTION_WRITE_LIMIT` is unset.
pub const DEFAULT_EXTRACTION_WRITE_LIMIT: usize = 100_000;
/// Maximum accepted request body for uploads when `UPLOAD_BODY_LIMIT_BYTES` is unset.
pub const DEFAULT_UPLOAD_BODY_LIMIT: usize = 100 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarization server and CLI.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Backend used to generate summaries.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the summarization backend.
    pub summarization_model: String,
    /// Optional replacement for the built-in system instruction.
    pub summarization_system_prompt: Option<String>,
    /// Optional override for the Ollama base URL.
    pub ollama_url: Option<String>,
    /// Optional override for the OpenAI-compatible base URL.
    pub openai_base_url: Option<String>,
    /// API key for the OpenAI-compatible backend.
    pub openai_api_key: Option<String>,
    /// Maximum number of characters kept from a document; `None` disables the limit.
    pub extraction_write_limit: Option<usize>,
    /// Maximum size in bytes of an upload request body.
    pub upload_body_limit: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Local Ollama runtime (`/api/chat`).
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    OpenAI,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value.parse().map_err(|()| {
                ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
            })?,
            None => SummarizationProvider::Ollama,
        };
        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        if summarization_provider == SummarizationProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        Ok(Self {
            summarization_provider,
            summarization_model: load_env("SUMMARIZATION_MODEL")?,
            summarization_system_prompt: load_env_optional("SUMMARIZATION_SYSTEM_PROMPT"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL"),
            openai_api_key,
            extraction_write_limit: parse_write_limit(load_env_optional(
                "EXTRACTION_WRITE_LIMIT",
            ))?,
            upload_body_limit: load_env_optional("UPLOAD_BODY_LIMIT_BYTES")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("UPLOAD_BODY_LIMIT_BYTES".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_UPLOAD_BODY_LIMIT),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

/// Interpret `EXTRACTION_WRITE_LIMIT`: unset keeps the default, negative disables the limit.
fn parse_write_limit(value: Option<String>) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = value else {
        return Ok(Some(DEFAULT_EXTRACTION_WRITE_LIMIT));
    };
    let parsed: i64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidValue("EXTRACTION_WRITE_LIMIT".to_string()))?;
    match parsed {
        0 => Err(ConfigError::InvalidValue(
            "EXTRACTION_WRITE_LIMIT must not be zero".to_string(),
        )),
        limit if limit < 0 => Ok(None),
        limit => usize::try_from(limit)
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue("EXTRACTION_WRITE_LIMIT".to_string())),
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load `.env` into the process environment without overriding variables already set.
///
/// Runs before tracing so `RUST_LOG` and `SUMMARIZE_LOG_FILE` may come from the file too.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load configuration from the environment and install it in the global cache.
///
/// Call after tracing is up; both the loaded values and any failure are logged.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    load_dotenv();
    let config = Config::from_env()
        .inspect_err(|error| tracing::error!(%error, "Invalid configuration"))?;
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        write_limit = ?config.extraction_write_limit,
        upload_body_limit = config.upload_body_limit,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_limit_defaults_when_unset() {
        assert_eq!(
            parse_write_limit(None).expect("default"),
            Some(DEFAULT_EXTRACTION_WRITE_LIMIT)
        );
    }

    #[test]
    fn negative_write_limit_disables_truncation() {
        assert_eq!(parse_write_limit(Some("-1".into())).expect("unlimited"), None);
        assert_eq!(
            parse_write_limit(Some("2048".into())).expect("explicit"),
            Some(2048)
        );
    }

    #[test]
    fn zero_or_garbage_write_limit_is_rejected() {
        assert!(matches!(
            parse_write_limit(Some("0".into())),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            parse_write_limit(Some("lots".into())),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn provider_parsing_is_case_insensitive() {
        assert_eq!(
            " OpenAI ".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::OpenAI)
        );
        assert_eq!(
            "ollama".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::Ollama)
        );
        assert!("claude".parse::<SummarizationProvider>().is_err());
    }
}
