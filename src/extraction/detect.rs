//! Format detection from magic bytes, file name, and content sniffing (in that order).

use super::types::DocumentFormat;
use std::path::Path;

/// Number of leading bytes inspected during detection.
pub const HEADER_LEN: usize = 4096;

/// Pick a parser for a document given its leading bytes and declared file name.
///
/// Magic bytes win over the extension: a PNG renamed to `notes.txt` is still rejected.
pub fn detect_format(header: &[u8], file_name: &str) -> DocumentFormat {
    let extension = file_extension(file_name);
    if let Some(format) = detect_magic(header, extension.as_deref()) {
        return format;
    }
    if let Some(format) = extension.as_deref().and_then(format_for_extension) {
        return format;
    }
    sniff_content(header)
}

/// Containers (ZIP, OLE) share one signature across many formats; the extension picks the
/// parser inside them.
fn detect_magic(header: &[u8], extension: Option<&str>) -> Option<DocumentFormat> {
    let unsupported = |mime| Some(DocumentFormat::Unsupported { mime });
    match header {
        [b'%', b'P', b'D', b'F', ..] => Some(DocumentFormat::Pdf),
        [b'P', b'K', 0x03, 0x04, ..] => match extension {
            Some("docx") => Some(DocumentFormat::Docx),
            Some("xlsx" | "xlsm" | "xlsb" | "ods") => Some(DocumentFormat::Spreadsheet),
            _ => unsupported("application/zip"),
        },
        [0xD0, 0xCF, 0x11, 0xE0, ..] => match extension {
            Some("xls") => Some(DocumentFormat::Spreadsheet),
            _ => unsupported("application/x-tika-msoffice"),
        },
        [0x89, b'P', b'N', b'G', ..] => unsupported("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => unsupported("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => unsupported("image/gif"),
        [0x1F, 0x8B, ..] => unsupported("application/gzip"),
        [0x7F, b'E', b'L', b'F', ..] => unsupported("application/x-executable"),
        _ => None,
    }
}

fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

fn format_for_extension(extension: &str) -> Option<DocumentFormat> {
    let format = match extension {
        "pdf" => DocumentFormat::Pdf,
        "docx" => DocumentFormat::Docx,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => DocumentFormat::Spreadsheet,
        "html" | "htm" | "xhtml" => DocumentFormat::Html,
        "md" | "markdown" => DocumentFormat::Markdown,
        "csv" => DocumentFormat::Csv,
        "tsv" | "tab" => DocumentFormat::Tsv,
        "txt" | "text" | "log" | "json" | "xml" | "yaml" | "yml" | "toml" | "ini" | "rst"
        | "adoc" | "rs" | "py" | "java" | "js" | "ts" | "go" | "c" | "h" | "cpp" | "sh"
        | "sql" => DocumentFormat::PlainText,
        _ => return None,
    };
    Some(format)
}

fn sniff_content(header: &[u8]) -> DocumentFormat {
    if header.is_empty() {
        return DocumentFormat::PlainText;
    }
    let Some(text) = utf8_prefix(header) else {
        return DocumentFormat::Unsupported {
            mime: "application/octet-stream",
        };
    };

    let lowered = text.trim_start().to_lowercase();
    if lowered.starts_with("<!doctype html") || lowered.starts_with("<html") {
        return DocumentFormat::Html;
    }

    let total = text.chars().count().max(1);
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    if printable as f64 / total as f64 > 0.80 {
        DocumentFormat::PlainText
    } else {
        DocumentFormat::Unsupported {
            mime: "application/octet-stream",
        }
    }
}

/// Decode the header as UTF-8, tolerating a multi-byte sequence cut off by the header window.
fn utf8_prefix(header: &[u8]) -> Option<&str> {
    match std::str::from_utf8(header) {
        Ok(text) => Some(text),
        Err(error) if error.error_len().is_none() => {
            std::str::from_utf8(&header[..error.valid_up_to()]).ok()
        }
        Err(_) => None,
    }
}
