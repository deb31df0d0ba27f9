#![deny(missing_docs)]

//! Core library for the Summarize Anything server and CLI.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document format detection and plain-text extraction.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Upload orchestration: extract, summarize, render.
pub mod pipeline;
/// Markdown rendering and HTML sanitization.
pub mod rendering;
/// Summarization client abstraction and adapters.
pub mod summarization;
