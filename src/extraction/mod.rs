//! Content extraction: turn an uploaded file into plain text.
//!
//! [`AutoDetectExtractor`] sniffs the format, dispatches to a parser, and enforces a character
//! write limit. Hitting the limit is recoverable: the text gathered so far comes back together
//! with a warning. Every other failure is an [`ExtractionError`].

pub mod detect;
mod parsers;
mod sink;
pub mod types;

pub use detect::detect_format;
pub use types::{DocumentFormat, ExtractedDocument, Extraction, ExtractionError, WriteLimitReached};

use detect::HEADER_LEN;
use sink::TextSink;
use std::io::Read;
use std::path::Path;
use types::ParseError;

/// Capability that converts a document on disk into plain text.
///
/// Implementations are blocking; async callers should run them on the blocking pool.
pub trait ContentExtractor: Send + Sync {
    /// Extract text from `source`, using `file_name` as a detection hint.
    fn extract(&self, source: &Path, file_name: &str) -> Result<Extraction, ExtractionError>;
}

/// Extractor that detects the document format and applies a character write limit.
#[derive(Debug, Clone)]
pub struct AutoDetectExtractor {
    write_limit: Option<usize>,
}

impl AutoDetectExtractor {
    /// Build an extractor; `None` disables the write limit.
    pub fn new(write_limit: Option<usize>) -> Self {
        Self { write_limit }
    }

    /// Configured character budget.
    pub fn write_limit(&self) -> Option<usize> {
        self.write_limit
    }
}

impl Default for AutoDetectExtractor {
    fn default() -> Self {
        Self::new(Some(crate::config::DEFAULT_EXTRACTION_WRITE_LIMIT))
    }
}

impl ContentExtractor for AutoDetectExtractor {
    fn extract(&self, source: &Path, file_name: &str) -> Result<Extraction, ExtractionError> {
        let byte_size = std::fs::metadata(source)?.len();
        let header = read_header(source)?;
        let format = detect_format(&header, file_name);
        tracing::debug!(
            file_name,
            byte_size,
            mime = format.as_mime(),
            "Detected document format"
        );

        let mut sink = TextSink::new(self.write_limit);
        let parsed = match format {
            DocumentFormat::PlainText | DocumentFormat::Markdown => {
                parsers::parse_text(source, &mut sink)
            }
            DocumentFormat::Html => parsers::parse_html(source, &mut sink),
            DocumentFormat::Csv => parsers::parse_delimited(source, b',', &mut sink),
            DocumentFormat::Tsv => parsers::parse_delimited(source, b'\t', &mut sink),
            DocumentFormat::Pdf => parsers::parse_pdf(source, &mut sink),
            DocumentFormat::Docx => parsers::parse_docx(source, &mut sink),
            DocumentFormat::Spreadsheet => parsers::parse_spreadsheet(source, &mut sink),
            DocumentFormat::Unsupported { mime } => {
                return Err(ExtractionError::UnsupportedFormat(mime.to_string()));
            }
        };

        let warning = match parsed {
            Ok(()) => None,
            Err(ParseError::LimitReached(reached)) => {
                tracing::warn!(file_name, limit = reached.limit, "Extraction write limit reached");
                Some(reached.to_string())
            }
            Err(ParseError::Failed(error)) => return Err(error),
        };

        Ok(Extraction {
            document: ExtractedDocument {
                text: sink.into_text(),
                file_name: file_name.to_string(),
                byte_size,
                format,
                truncated: warning.is_some(),
            },
            warning,
        })
    }
}

fn read_header(source: &Path) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(source)?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn upload(name: &str, contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .and_then(|mut file| file.write_all(contents))
            .expect("write upload");
        (dir, path)
    }

    #[test]
    fn small_text_is_returned_verbatim_without_warning() {
        let (_dir, path) = upload("hello.txt", b"hello world");
        let extraction = AutoDetectExtractor::default()
            .extract(&path, "hello.txt")
            .expect("extraction");

        assert_eq!(extraction.document.text, "hello world");
        assert_eq!(extraction.document.byte_size, 11);
        assert_eq!(extraction.document.format, DocumentFormat::PlainText);
        assert!(!extraction.document.truncated);
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn content_just_over_limit_is_truncated_with_warning() {
        let body = "x".repeat(33);
        let (_dir, path) = upload("long.txt", body.as_bytes());
        let extraction = AutoDetectExtractor::new(Some(32))
            .extract(&path, "long.txt")
            .expect("partial extraction is not an error");

        assert_eq!(extraction.document.text.chars().count(), 32);
        assert!(extraction.document.truncated);
        let warning = extraction.warning.expect("warning");
        assert!(warning.contains("more than 32 characters"));
    }

    #[test]
    fn content_at_limit_is_complete() {
        let (_dir, path) = upload("exact.md", b"# Title");
        let extraction = AutoDetectExtractor::new(Some(7))
            .extract(&path, "exact.md")
            .expect("extraction");
        assert_eq!(extraction.document.text, "# Title");
        assert_eq!(extraction.document.format, DocumentFormat::Markdown);
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn unlimited_extractor_never_truncates() {
        let body = "y".repeat(250_000);
        let (_dir, path) = upload("big.txt", body.as_bytes());
        let extraction = AutoDetectExtractor::new(None)
            .extract(&path, "big.txt")
            .expect("extraction");
        assert_eq!(extraction.document.text.len(), 250_000);
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn unsupported_content_is_fatal() {
        let (_dir, path) = upload("photo.jpg", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        let error = AutoDetectExtractor::default()
            .extract(&path, "photo.jpg")
            .expect_err("images are not extractable");
        assert!(matches!(error, ExtractionError::UnsupportedFormat(mime) if mime == "image/jpeg"));
    }

    #[test]
    fn corrupt_pdf_is_fatal() {
        let (_dir, path) = upload("broken.pdf", b"%PDF-1.7 garbage without xref");
        let error = AutoDetectExtractor::default()
            .extract(&path, "broken.pdf")
            .expect_err("corrupt pdf");
        assert!(matches!(error, ExtractionError::Malformed { .. }));
    }

    #[test]
    fn docx_upload_is_extracted_by_name() {
        use docx_rust::{Docx, document::Paragraph};

        let dir = tempfile::tempdir().expect("temp dir");
        // Spooled uploads keep no extension; the declared name drives detection.
        let path = dir.path().join("upload-1234");
        let mut docx = Docx::default();
        docx.document
            .push(Paragraph::default().push_text("Board minutes"));
        docx.write_file(&path).expect("write docx");

        let extraction = AutoDetectExtractor::default()
            .extract(&path, "minutes.docx")
            .expect("extraction");
        assert_eq!(extraction.document.format, DocumentFormat::Docx);
        assert_eq!(extraction.document.text, "Board minutes");
    }

    #[test]
    fn plain_zip_archives_stay_unsupported() {
        let (_dir, path) = upload("bundle.zip", b"PK\x03\x04rest");
        let error = AutoDetectExtractor::default()
            .extract(&path, "bundle.zip")
            .expect_err("archives are not extractable");
        assert!(
            matches!(error, ExtractionError::UnsupportedFormat(mime) if mime == "application/zip")
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = AutoDetectExtractor::default()
            .extract(&dir.path().join("gone.txt"), "gone.txt")
            .expect_err("missing file");
        assert!(matches!(error, ExtractionError::Io(_)));
    }
}
