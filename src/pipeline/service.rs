//! Orchestrates one upload from raw bytes to rendered output.

use crate::{
    config::get_config,
    extraction::{AutoDetectExtractor, ContentExtractor},
    metrics::{MetricsSnapshot, PipelineMetrics},
    pipeline::{
        display::DisplaySurface,
        types::{PipelineError, PipelineOutcome, PipelineStage, UploadedFile},
    },
    rendering::{CommonMarkRenderer, MarkdownRenderer},
    summarization::{SummarizationClientError, Summarizer},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::Instrument;
use uuid::Uuid;

/// Runs uploads through extraction, summarization and rendering.
///
/// Construct once at startup and share through an `Arc`. Runs are serialized: a second upload
/// waits until the first one has published its result or its error.
pub struct UploadPipeline {
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Summarizer,
    renderer: Box<dyn MarkdownRenderer>,
    metrics: PipelineMetrics,
    run_lock: Mutex<()>,
    stage: watch::Sender<PipelineStage>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Run one upload and publish the result to `surface`.
    async fn summarize_upload(
        &self,
        upload: UploadedFile,
        surface: &dyn DisplaySurface,
    ) -> Result<PipelineOutcome, PipelineError>;

    /// Current pipeline position.
    fn stage(&self) -> PipelineStage;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl UploadPipeline {
    /// Assemble a pipeline from explicit components.
    pub fn new(
        extractor: Arc<dyn ContentExtractor>,
        summarizer: Summarizer,
        renderer: Box<dyn MarkdownRenderer>,
    ) -> Self {
        let (stage, _) = watch::channel(PipelineStage::Idle);
        Self {
            extractor,
            summarizer,
            renderer,
            metrics: PipelineMetrics::new(),
            run_lock: Mutex::new(()),
            stage,
        }
    }

    /// Build the default pipeline from the global configuration.
    pub fn from_config() -> Result<Self, SummarizationClientError> {
        let config = get_config();
        tracing::info!("Initializing summarization client");
        let summarizer = Summarizer::from_config()?;
        tracing::info!(
            provider = ?config.summarization_provider,
            model = %config.summarization_model,
            "Summarization client initialized"
        );
        Ok(Self::new(
            Arc::new(AutoDetectExtractor::new(config.extraction_write_limit)),
            summarizer,
            Box::new(CommonMarkRenderer::new()),
        ))
    }

    /// Current pipeline position.
    pub fn stage(&self) -> PipelineStage {
        *self.stage.borrow()
    }

    /// Watch stage transitions as they happen.
    pub fn subscribe(&self) -> watch::Receiver<PipelineStage> {
        self.stage.subscribe()
    }

    /// Return a snapshot of the pipeline counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run one upload to completion.
    ///
    /// Extraction warnings go to [`DisplaySurface::notify`] and the run continues with the
    /// partial text. A fatal error is shown once through [`DisplaySurface::show_error`] and
    /// returned. On success the output region is replaced with the rendered summary.
    pub async fn run(
        &self,
        upload: UploadedFile,
        surface: &dyn DisplaySurface,
    ) -> Result<PipelineOutcome, PipelineError> {
        let _guard = self.run_lock.lock().await;
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %Uuid::new_v4(),
            file_name = upload.file_name(),
            byte_size = upload.byte_size(),
        );
        self.run_locked(upload, surface).instrument(span).await
    }

    async fn run_locked(
        &self,
        upload: UploadedFile,
        surface: &dyn DisplaySurface,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.metrics.record_upload();
        tracing::info!("Upload received");

        self.transition(PipelineStage::Extracting);
        let extractor = Arc::clone(&self.extractor);
        let joined = tokio::task::spawn_blocking(move || {
            let result = extractor.extract(upload.path(), upload.file_name());
            drop(upload);
            result
        })
        .await;

        let extraction = match joined {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(error)) => {
                self.metrics.record_extraction_failure();
                return Err(self.fail(PipelineError::Extraction(error), surface));
            }
            Err(error) => {
                self.metrics.record_extraction_failure();
                return Err(self.fail(PipelineError::ExtractionTask(error.to_string()), surface));
            }
        };

        let document = extraction.document;
        tracing::info!(
            format = document.format.as_mime(),
            characters = document.text.chars().count(),
            truncated = document.truncated,
            "Extraction finished"
        );
        if let Some(warning) = &extraction.warning {
            self.metrics.record_partial_extraction();
            surface.notify(warning);
        }

        self.transition(PipelineStage::Summarizing);
        let markdown = match self.summarizer.summarize(&document.text).await {
            Ok(markdown) => markdown,
            Err(error) => {
                self.metrics.record_summarization_failure();
                return Err(self.fail(PipelineError::Summarization(error), surface));
            }
        };

        self.transition(PipelineStage::Rendering);
        let output = self.renderer.render(&markdown);
        surface.replace_output(&output);
        self.metrics.record_rendered();
        self.transition(PipelineStage::Idle);
        tracing::info!(
            markdown_len = markdown.len(),
            html_len = output.as_str().len(),
            "Summary rendered"
        );

        Ok(PipelineOutcome {
            file_name: document.file_name,
            byte_size: document.byte_size,
            format: document.format,
            truncated: document.truncated,
            warning: extraction.warning,
            markdown,
            output,
        })
    }

    fn transition(&self, next: PipelineStage) {
        let previous = self.stage.send_replace(next);
        tracing::debug!(from = %previous, to = %next, "Pipeline stage changed");
    }

    fn fail(&self, error: PipelineError, surface: &dyn DisplaySurface) -> PipelineError {
        self.transition(PipelineStage::Failed);
        tracing::error!(%error, "Pipeline run failed");
        surface.show_error(&error.to_string());
        self.transition(PipelineStage::Idle);
        error
    }
}

#[async_trait]
impl PipelineApi for UploadPipeline {
    async fn summarize_upload(
        &self,
        upload: UploadedFile,
        surface: &dyn DisplaySurface,
    ) -> Result<PipelineOutcome, PipelineError> {
        UploadPipeline::run(self, upload, surface).await
    }

    fn stage(&self) -> PipelineStage {
        UploadPipeline::stage(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        UploadPipeline::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{Extraction, ExtractionError};
    use crate::pipeline::CollectingSurface;
    use crate::summarization::{DEFAULT_SYSTEM_PROMPT, SummarizationClient, SummarizationRequest};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct ScriptedClient {
        reply: Option<String>,
        requests: Arc<StdMutex<Vec<SummarizationRequest>>>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
        delay: Option<Duration>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self::default()
        }

        fn calls(&self) -> Vec<SummarizationRequest> {
            self.requests.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl SummarizationClient for ScriptedClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            self.requests.lock().expect("lock").push(request);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.reply.clone().ok_or_else(|| {
                SummarizationClientError::GenerationFailed("backend exploded".into())
            })
        }
    }

    /// Extractor that fails after recording which file it was handed.
    #[derive(Default)]
    struct BrokenExtractor {
        seen: StdMutex<Option<PathBuf>>,
    }

    impl ContentExtractor for BrokenExtractor {
        fn extract(&self, source: &Path, _file_name: &str) -> Result<Extraction, ExtractionError> {
            *self.seen.lock().expect("lock") = Some(source.to_path_buf());
            Err(ExtractionError::Malformed {
                format: "application/pdf",
                message: "xref table missing".into(),
            })
        }
    }

    fn pipeline(extractor: Arc<dyn ContentExtractor>, client: ScriptedClient) -> UploadPipeline {
        UploadPipeline::new(
            extractor,
            Summarizer::new(Box::new(client), "test-model", DEFAULT_SYSTEM_PROMPT),
            Box::new(CommonMarkRenderer::new()),
        )
    }

    #[tokio::test]
    async fn successful_run_publishes_rendered_summary() {
        let client = ScriptedClient::replying("**Key point**\n- a\n- b");
        let pipeline = pipeline(Arc::new(AutoDetectExtractor::default()), client.clone());
        let surface = CollectingSurface::new();
        let upload = UploadedFile::from_bytes("hello.txt", b"hello world").expect("upload");
        let temp_path = upload.path().to_path_buf();

        let outcome = pipeline.run(upload, &surface).await.expect("outcome");

        assert!(!temp_path.exists(), "temp file should be gone");
        let expected = CommonMarkRenderer::new().render("**Key point**\n- a\n- b");
        assert_eq!(outcome.output, expected);
        assert_eq!(outcome.markdown, "**Key point**\n- a\n- b");
        assert_eq!(outcome.byte_size, 11);
        assert!(!outcome.truncated);

        let state = surface.into_state();
        assert_eq!(state.output, Some(expected));
        assert!(state.notifications.is_empty());
        assert!(state.error.is_none());

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user_message, "Text to summarize: hello world");
        assert_eq!(pipeline.stage(), PipelineStage::Idle);

        let metrics = pipeline.metrics_snapshot();
        assert_eq!(metrics.uploads_received, 1);
        assert_eq!(metrics.summaries_rendered, 1);
    }

    #[tokio::test]
    async fn extraction_failure_skips_summarization_and_cleans_up() {
        let extractor = Arc::new(BrokenExtractor::default());
        let client = ScriptedClient::replying("unused");
        let pipeline = pipeline(extractor.clone(), client.clone());
        let surface = CollectingSurface::new();
        let upload = UploadedFile::from_bytes("broken.pdf", b"%PDF-garbage").expect("upload");

        let error = pipeline.run(upload, &surface).await.expect_err("failure");

        assert!(matches!(error, PipelineError::Extraction(_)));
        assert!(client.calls().is_empty(), "summarizer must not be called");
        let seen = extractor.seen.lock().expect("lock").clone().expect("path");
        assert!(!seen.exists(), "temp file should be gone after failure");

        let state = surface.into_state();
        let message = state.error.expect("inline error");
        assert!(message.starts_with("Parsing Data failed: "), "{message}");
        assert!(state.output.is_none());
        assert_eq!(pipeline.stage(), PipelineStage::Idle);
        assert_eq!(pipeline.metrics_snapshot().extraction_failures, 1);
    }

    #[tokio::test]
    async fn write_limit_warning_is_shown_and_partial_text_is_summarized() {
        let client = ScriptedClient::replying("short");
        let pipeline = pipeline(Arc::new(AutoDetectExtractor::new(Some(32))), client.clone());
        let surface = CollectingSurface::new();
        let upload =
            UploadedFile::from_bytes("long.txt", "z".repeat(33).as_bytes()).expect("upload");

        let outcome = pipeline.run(upload, &surface).await.expect("outcome");

        assert!(outcome.truncated);
        let state = surface.into_state();
        assert_eq!(state.notifications.len(), 1);
        assert!(state.notifications[0].contains("more than 32 characters"));
        assert!(state.output.is_some());

        let calls = client.calls();
        assert_eq!(
            calls[0].user_message,
            format!("Text to summarize: {}", "z".repeat(32))
        );
        assert_eq!(pipeline.metrics_snapshot().partial_extractions, 1);
    }

    #[tokio::test]
    async fn summarization_failure_is_reported_once() {
        let pipeline = pipeline(
            Arc::new(AutoDetectExtractor::default()),
            ScriptedClient::failing(),
        );
        let surface = CollectingSurface::new();
        let upload = UploadedFile::from_bytes("a.md", b"# Title").expect("upload");

        let error = pipeline.run(upload, &surface).await.expect_err("failure");

        assert!(matches!(error, PipelineError::Summarization(_)));
        let state = surface.into_state();
        assert_eq!(
            state.error.as_deref(),
            Some("Summarization failed: Failed to generate summary: backend exploded")
        );
        assert!(state.output.is_none());
        assert_eq!(pipeline.metrics_snapshot().summarization_failures, 1);
        assert_eq!(pipeline.metrics_snapshot().summaries_rendered, 0);
    }

    #[tokio::test]
    async fn concurrent_uploads_are_serialized() {
        let client = ScriptedClient {
            reply: Some("ok".into()),
            delay: Some(Duration::from_millis(50)),
            ..ScriptedClient::default()
        };
        let pipeline = pipeline(Arc::new(AutoDetectExtractor::default()), client.clone());
        let first_surface = CollectingSurface::new();
        let second_surface = CollectingSurface::new();
        let first = UploadedFile::from_bytes("one.txt", b"one").expect("upload");
        let second = UploadedFile::from_bytes("two.txt", b"two").expect("upload");

        let (a, b) = tokio::join!(
            pipeline.run(first, &first_surface),
            pipeline.run(second, &second_surface)
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(client.calls().len(), 2);
        assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stage_changes_are_observable() {
        let pipeline = pipeline(
            Arc::new(AutoDetectExtractor::default()),
            ScriptedClient::replying("done"),
        );
        let mut stages = pipeline.subscribe();
        assert_eq!(*stages.borrow_and_update(), PipelineStage::Idle);

        let upload = UploadedFile::from_bytes("x.txt", b"x").expect("upload");
        pipeline
            .run(upload, &CollectingSurface::new())
            .await
            .expect("outcome");

        assert!(stages.has_changed().expect("sender alive"));
        assert_eq!(*stages.borrow_and_update(), PipelineStage::Idle);
    }
}
