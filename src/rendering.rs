//! Markdown to HTML rendering.
//!
//! Summaries come from an LLM and are treated as untrusted: the CommonMark output is always
//! passed through an HTML sanitizer before it reaches a display surface.

use pulldown_cmark::{Options, Parser, html};
use serde::Serialize;

/// Sanitized HTML ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenderedOutput(String);

impl RenderedOutput {
    /// Borrow the HTML markup.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the HTML markup.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RenderedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Converts Markdown into displayable, sanitized HTML.
pub trait MarkdownRenderer: Send + Sync {
    /// Render `markdown`. Rendering never fails; malformed input degrades to literal text.
    fn render(&self, markdown: &str) -> RenderedOutput;
}

/// Strict CommonMark renderer followed by a whitelist sanitizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMarkRenderer;

impl CommonMarkRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> RenderedOutput {
        let parser = Parser::new_ext(markdown, Options::empty());
        let mut unsafe_html = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut unsafe_html, parser);
        RenderedOutput(ammonia::clean(&unsafe_html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_emphasis_and_lists() {
        let output = CommonMarkRenderer::new().render("**Key point**\n- a\n- b");
        let html = output.as_str();

        assert!(html.contains("<strong>Key point</strong>"), "{html}");
        assert!(html.contains("<ul>"), "{html}");
        assert_eq!(html.matches("<li>").count(), 2, "{html}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = CommonMarkRenderer::new();
        let markdown = "# Summary\n\n1. first\n2. second\n\n> quoted `code`";
        assert_eq!(renderer.render(markdown), renderer.render(markdown));
    }

    #[test]
    fn scripts_and_javascript_links_are_removed() {
        let output = CommonMarkRenderer::new()
            .render("hello <script>alert('x')</script>\n\n[click](javascript:alert(1))");
        let html = output.as_str();

        assert!(!html.contains("<script"), "{html}");
        assert!(!html.contains("javascript:"), "{html}");
        assert!(html.contains("hello"), "{html}");
    }

    #[test]
    fn empty_markdown_renders_empty_output() {
        assert_eq!(CommonMarkRenderer::new().render("").as_str(), "");
    }
}
