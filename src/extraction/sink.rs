//! Bounded text buffer shared by every parser.

use super::types::WriteLimitReached;

/// Accumulates extracted text and stops accepting input once `limit` characters are written.
///
/// The write that crosses the limit keeps its leading part (cut on a character boundary) so the
/// caller still sees every character up to the budget.
#[derive(Debug)]
pub(crate) struct TextSink {
    text: String,
    limit: Option<usize>,
    written: usize,
}

impl TextSink {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            text: String::new(),
            limit,
            written: 0,
        }
    }

    pub(crate) fn write(&mut self, chunk: &str) -> Result<(), WriteLimitReached> {
        let Some(limit) = self.limit else {
            self.text.push_str(chunk);
            return Ok(());
        };

        let remaining = limit.saturating_sub(self.written);
        let chunk_chars = chunk.chars().count();
        if chunk_chars <= remaining {
            self.text.push_str(chunk);
            self.written += chunk_chars;
            return Ok(());
        }

        let cut = chunk
            .char_indices()
            .nth(remaining)
            .map_or(chunk.len(), |(index, _)| index);
        self.text.push_str(&chunk[..cut]);
        self.written = limit;
        Err(WriteLimitReached { limit })
    }

    pub(crate) fn into_text(self) -> String {
        self.text
    }
}
