//! Format-specific parsers. Each one streams text into a [`TextSink`] and stops as soon as the
//! sink reports that the write limit has been reached.

use super::sink::TextSink;
use super::types::{DocumentFormat, ExtractionError, ParseError};
use calamine::{Data, Range, Reader};
use std::io::Cursor;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Line width handed to html2text; wide enough that paragraphs are never re-wrapped.
const HTML_WIDTH: usize = 10_000;

/// Plain text and Markdown: decoded as UTF-8 (lossy, BOM stripped) and emitted verbatim.
pub(crate) fn parse_text(path: &Path, sink: &mut TextSink) -> Result<(), ParseError> {
    let bytes = std::fs::read(path)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    sink.write(&String::from_utf8_lossy(body))?;
    Ok(())
}

/// HTML: visible text only, one line per block, entities decoded.
pub(crate) fn parse_html(path: &Path, sink: &mut TextSink) -> Result<(), ParseError> {
    let bytes = std::fs::read(path)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    let text =
        html2text::from_read(body, HTML_WIDTH).map_err(|error| ExtractionError::Malformed {
            format: DocumentFormat::Html.as_mime(),
            message: error.to_string(),
        })?;

    let text = text.replace('\u{a0}', " ");
    write_lines(text.trim().lines().map(str::trim_end), sink)
}

/// DOCX: paragraph text of the main document body, one paragraph per line.
pub(crate) fn parse_docx(path: &Path, sink: &mut TextSink) -> Result<(), ParseError> {
    let malformed = |error: docx_rust::DocxError| ExtractionError::Malformed {
        format: DocumentFormat::Docx.as_mime(),
        message: error.to_string(),
    };
    let file = docx_rust::DocxFile::from_file(path).map_err(malformed)?;
    let docx = file.parse().map_err(malformed)?;

    let text = docx.document.body.text().replace("\r\n", "\n");
    write_lines(text.trim().lines().map(str::trim_end), sink)
}

/// Spreadsheets: every sheet in workbook order, its name on one line, then one row per line
/// with cells joined by a tab. Sheets are separated by a blank line.
pub(crate) fn parse_spreadsheet(path: &Path, sink: &mut TextSink) -> Result<(), ParseError> {
    let malformed = |error: calamine::Error| ExtractionError::Malformed {
        format: DocumentFormat::Spreadsheet.as_mime(),
        message: error.to_string(),
    };
    // Detection by content, since spooled uploads do not keep their extension.
    let bytes = std::fs::read(path)?;
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(malformed)?;

    let sheet_names = workbook.sheet_names();
    tracing::debug!(sheet_count = sheet_names.len(), "Loaded workbook");
    for (index, name) in sheet_names.iter().enumerate() {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(error) => {
                tracing::warn!(sheet = %name, %error, "Skipping unreadable sheet");
                continue;
            }
        };
        if index > 0 {
            sink.write("\n")?;
        }
        sink.write(name)?;
        sink.write("\n")?;
        write_sheet(&range, sink)?;
    }
    Ok(())
}

fn write_sheet(range: &Range<Data>, sink: &mut TextSink) -> Result<(), ParseError> {
    for row in range.rows() {
        let used = row
            .iter()
            .rposition(|cell| *cell != Data::Empty)
            .map_or(0, |last| last + 1);
        let line = row[..used]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\t");
        sink.write(&line)?;
        sink.write("\n")?;
    }
    Ok(())
}

/// Writes lines, collapsing runs of blank lines into one.
fn write_lines<'a>(
    lines: impl Iterator<Item = &'a str>,
    sink: &mut TextSink,
) -> Result<(), ParseError> {
    let mut first = true;
    let mut pending_blank = false;
    for line in lines {
        if line.trim().is_empty() {
            pending_blank = true;
            continue;
        }
        if !first {
            sink.write(if pending_blank { "\n\n" } else { "\n" })?;
        }
        sink.write(line)?;
        first = false;
        pending_blank = false;
    }
    Ok(())
}

/// CSV/TSV: one record per line, fields joined by a tab.
pub(crate) fn parse_delimited(
    path: &Path,
    delimiter: u8,
    sink: &mut TextSink,
) -> Result<(), ParseError> {
    let format = if delimiter == b'\t' {
        DocumentFormat::Tsv
    } else {
        DocumentFormat::Csv
    };
    let malformed = |error: csv::Error| ExtractionError::Malformed {
        format: format.as_mime(),
        message: error.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(malformed)?;

    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record).map_err(malformed)? {
        let line = record.iter().collect::<Vec<_>>().join("\t");
        sink.write(&line)?;
        sink.write("\n")?;
    }
    Ok(())
}

/// PDF: page-by-page text. Pages that fail to decode are skipped; an unreadable file is fatal.
pub(crate) fn parse_pdf(path: &Path, sink: &mut TextSink) -> Result<(), ParseError> {
    let document = lopdf::Document::load(path).map_err(|error| ExtractionError::Malformed {
        format: DocumentFormat::Pdf.as_mime(),
        message: error.to_string(),
    })?;

    let pages = document.get_pages();
    tracing::debug!(page_count = pages.len(), "Loaded PDF");

    let mut first = true;
    for page_number in pages.keys().copied() {
        let text = match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(page = page_number, %error, "Skipping unreadable PDF page");
                continue;
            }
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if !first {
            sink.write("\n\n")?;
        }
        sink.write(text)?;
        first = false;
    }
    Ok(())
}
