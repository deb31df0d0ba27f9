//! Data types and error definitions for document extraction.

use serde::Serialize;
use thiserror::Error;

/// Document formats the extractor knows how to turn into plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DocumentFormat {
    /// UTF-8 (or close enough) text emitted verbatim.
    PlainText,
    /// Markdown source, treated as text.
    Markdown,
    /// HTML markup; only visible body text is kept.
    Html,
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    Tsv,
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document (`.docx`).
    Docx,
    /// Spreadsheet workbook (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`).
    Spreadsheet,
    /// Recognized but not extractable content.
    Unsupported {
        /// Best-effort media type of the rejected content.
        mime: &'static str,
    },
}

impl DocumentFormat {
    /// Media type associated with the format.
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Html => "text/html",
            Self::Csv => "text/csv",
            Self::Tsv => "text/tab-separated-values",
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Spreadsheet => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Unsupported { mime } => mime,
        }
    }

    /// Whether a parser exists for the format.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}

/// Plain-text content recovered from an uploaded file, plus the metadata kept alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Extracted text; never longer than the configured write limit (in characters).
    pub text: String,
    /// Sanitized file name declared by the uploader.
    pub file_name: String,
    /// Size of the source file in bytes.
    pub byte_size: u64,
    /// Format chosen by detection.
    pub format: DocumentFormat,
    /// `true` when parsing stopped at the write limit.
    pub truncated: bool,
}

/// Result of a successful (possibly partial) extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Text and metadata of the document.
    pub document: ExtractedDocument,
    /// User-facing warning raised when only part of the document was read.
    pub warning: Option<String>,
}

/// Fatal extraction failures. Reaching the write limit is not one of them.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Source could not be read from disk.
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    /// Detection found content no parser handles.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    /// Parser rejected the content.
    #[error("malformed {format} document: {message}")]
    Malformed {
        /// Media type of the parser that failed.
        format: &'static str,
        /// Parser diagnostic.
        message: String,
    },
}

/// Raised by the text sink once the character budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "Your document contained more than {limit} characters, and so your requested limit has been reached. To receive the full text of the document, increase your limit. (Text up to the limit is however available)."
)]
pub struct WriteLimitReached {
    /// Character budget that was hit.
    pub limit: usize,
}

/// Internal parser outcome: either the budget ran out or the document is broken.
#[derive(Debug)]
pub(crate) enum ParseError {
    LimitReached(WriteLimitReached),
    Failed(ExtractionError),
}

impl From<WriteLimitReached> for ParseError {
    fn from(reached: WriteLimitReached) -> Self {
        Self::LimitReached(reached)
    }
}

impl From<ExtractionError> for ParseError {
    fn from(error: ExtractionError) -> Self {
        Self::Failed(error)
    }
}

impl From<std::io::Error> for ParseError {
    fn from(error: std::io::Error) -> Self {
        Self::Failed(ExtractionError::Io(error))
    }
}
