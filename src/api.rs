//! HTTP surface for Summarize Anything.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Single page with a file picker, a notification area and the output region.
//! - `POST /summarize` – Multipart upload. The first part carrying a file name is extracted,
//!   summarized and rendered; the response carries the Markdown, the sanitized HTML, and any
//!   notifications raised along the way.
//! - `GET /status` – Current pipeline stage.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::pipeline::{CollectingSurface, PipelineApi, PipelineError, UploadedFile};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const INDEX_PAGE: &str = include_str!("../assets/index.html");

/// Build the HTTP router. `body_limit` caps the size of upload requests in bytes.
pub fn create_router<S>(service: Arc<S>, body_limit: usize) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/", get(index_page))
        .route("/summarize", post(summarize_upload::<S>))
        .route("/status", get(get_status::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Success response for the `POST /summarize` endpoint.
#[derive(Serialize)]
struct SummarizeResponse {
    /// Sanitized name of the uploaded file.
    file_name: String,
    /// Upload size in bytes.
    byte_size: u64,
    /// Detected media type.
    format: &'static str,
    /// Whether only part of the document was summarized.
    truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    /// Transient messages raised during the run.
    notifications: Vec<String>,
    /// Summary as returned by the backend.
    markdown: String,
    /// Sanitized HTML rendering of `markdown`.
    html: String,
    /// RFC 3339 timestamp of when the summary was rendered.
    generated_at: String,
}

/// Summarize an uploaded document.
///
/// Reads multipart fields until one carries a file name, spools it to a temporary file and
/// runs it through the pipeline.
async fn summarize_upload<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: PipelineApi,
{
    let mut multipart = multipart.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let (file_name, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|error| AppError::BadRequest(format!("Failed to read multipart: {error}")))?
            .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|error| AppError::BadRequest(format!("Failed to read file: {error}")))?;
        break (file_name, bytes);
    };
    tracing::debug!(file_name = %file_name, byte_size = bytes.len(), "Upload body read");

    let upload = tokio::task::spawn_blocking(move || UploadedFile::from_bytes(&file_name, &bytes))
        .await
        .map_err(|error| AppError::Internal(format!("Upload task failed: {error}")))?
        .map_err(|error| AppError::Internal(format!("Failed to store upload: {error}")))?;

    let surface = CollectingSurface::new();
    let result = service.summarize_upload(upload, &surface).await;
    let state = surface.into_state();
    let outcome = result.map_err(|error| AppError::Pipeline {
        error,
        notifications: state.notifications.clone(),
    })?;
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|error| AppError::Internal(format!("Failed to format timestamp: {error}")))?;

    Ok(Json(SummarizeResponse {
        file_name: outcome.file_name,
        byte_size: outcome.byte_size,
        format: outcome.format.as_mime(),
        truncated: outcome.truncated,
        warning: outcome.warning,
        notifications: state.notifications,
        markdown: outcome.markdown,
        html: outcome.output.into_string(),
        generated_at,
    }))
}

/// Report where the pipeline currently is.
async fn get_status<S>(State(service): State<Arc<S>>) -> Json<serde_json::Value>
where
    S: PipelineApi,
{
    Json(json!({ "stage": service.stage() }))
}

/// Return a snapshot of the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Upload one document as multipart/form-data; returns the Markdown summary and its sanitized HTML rendering.",
                request_example: Some(json!({
                    "content_type": "multipart/form-data",
                    "fields": { "file": "report.pdf" }
                })),
            },
            CommandDescriptor {
                name: "status",
                method: "GET",
                path: "/status",
                description: "Return the current pipeline stage (idle, extracting, summarizing, rendering, failed).",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload, render and failure counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    /// Notifications raised before the failure still reach the client.
    Pipeline {
        error: PipelineError,
        notifications: Vec<String>,
    },
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, notifications) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message, Vec::new()),
            Self::Pipeline {
                error,
                notifications,
            } => {
                let status = match error {
                    PipelineError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    PipelineError::ExtractionTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    PipelineError::Summarization(_) => StatusCode::BAD_GATEWAY,
                };
                (status, error.to_string(), notifications)
            }
            Self::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message, Vec::new())
            }
        };
        let body = json!({ "error": message, "notifications": notifications });
        (status, Json(body)).into_response()
    }
}
