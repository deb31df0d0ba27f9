//! Data types and error definitions for the upload pipeline.

use crate::extraction::{DocumentFormat, ExtractionError};
use crate::rendering::RenderedOutput;
use crate::summarization::SummarizationClientError;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

const MAX_FILE_NAME_CHARS: usize = 255;

/// Uploaded bytes spooled to a temporary file.
///
/// The temporary file is deleted when the value is dropped.
#[derive(Debug)]
pub struct UploadedFile {
    file: NamedTempFile,
    file_name: String,
    byte_size: u64,
}

impl UploadedFile {
    /// Spool an in-memory upload body to disk.
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        Self::spool(file_name, bytes)
    }

    /// Spool everything `reader` yields to disk.
    pub fn spool<R: Read>(file_name: &str, mut reader: R) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("summarize-upload-")
            .tempfile()?;
        let byte_size = std::io::copy(&mut reader, &mut file)?;
        file.flush()?;
        Ok(Self {
            file,
            file_name: sanitize_file_name(file_name),
            byte_size,
        })
    }

    /// Location of the spooled bytes.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Sanitized name declared by the uploader.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Number of bytes received.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }
}

/// Strip directory components and control characters from a client-supplied file name.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let clean: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILE_NAME_CHARS)
        .collect();

    if clean.is_empty() || clean == "." || clean == ".." {
        "document".to_string()
    } else {
        clean
    }
}

/// Pipeline position. Runs go `Idle → Extracting → Summarizing → Rendering → Idle` or end in
/// `Failed` before returning to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Waiting for an upload.
    #[default]
    Idle,
    /// Reading text out of the uploaded file.
    Extracting,
    /// Waiting on the summarization backend.
    Summarizing,
    /// Converting the summary to HTML.
    Rendering,
    /// A fatal error was reported for the current run.
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Summarizing => "summarizing",
            Self::Rendering => "rendering",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Sanitized name of the uploaded file.
    pub file_name: String,
    /// Upload size in bytes.
    pub byte_size: u64,
    /// Format chosen by detection.
    pub format: DocumentFormat,
    /// `true` when only part of the document was summarized.
    pub truncated: bool,
    /// Warning shown to the user when extraction stopped early.
    pub warning: Option<String>,
    /// Markdown returned by the summarization backend.
    pub markdown: String,
    /// Sanitized HTML published to the display surface.
    pub output: RenderedOutput,
}

/// Fatal pipeline failures. The display text is what the user sees.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Extraction could not produce any text.
    #[error("Parsing Data failed: {0}")]
    Extraction(#[source] ExtractionError),
    /// The extraction worker panicked or was cancelled.
    #[error("Parsing Data failed: extraction task aborted: {0}")]
    ExtractionTask(String),
    /// The summarization backend failed.
    #[error("Summarization failed: {0}")]
    Summarization(#[source] SummarizationClientError),
}
