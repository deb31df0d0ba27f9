//! Where pipeline results end up.

use crate::rendering::RenderedOutput;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Output region plus notification channel that a pipeline run reports to.
pub trait DisplaySurface: Send + Sync {
    /// Show a transient, non-fatal message.
    fn notify(&self, message: &str);

    /// Show a fatal error inline. Called at most once per run.
    fn show_error(&self, message: &str);

    /// Replace whatever the output region currently shows.
    fn replace_output(&self, output: &RenderedOutput);
}

/// Snapshot of what a [`CollectingSurface`] has been told.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceState {
    /// Notifications in the order they were raised.
    pub notifications: Vec<String>,
    /// Inline error, if the last run failed.
    pub error: Option<String>,
    /// Current output region contents.
    pub output: Option<RenderedOutput>,
}

/// Display surface that records everything in memory, used by the HTTP layer to build
/// responses.
#[derive(Debug, Default)]
pub struct CollectingSurface {
    state: Mutex<SurfaceState>,
}

impl CollectingSurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recorded state.
    pub fn snapshot(&self) -> SurfaceState {
        self.lock().clone()
    }

    /// Consume the surface, returning the recorded state.
    pub fn into_state(self) -> SurfaceState {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DisplaySurface for CollectingSurface {
    fn notify(&self, message: &str) {
        self.lock().notifications.push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        let mut state = self.lock();
        state.output = None;
        state.error = Some(message.to_string());
    }

    fn replace_output(&self, output: &RenderedOutput) {
        let mut state = self.lock();
        state.error = None;
        state.output = Some(output.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::{CommonMarkRenderer, MarkdownRenderer};

    #[test]
    fn output_is_replaced_not_appended() {
        let renderer = CommonMarkRenderer::new();
        let surface = CollectingSurface::new();
        surface.replace_output(&renderer.render("first"));
        surface.replace_output(&renderer.render("second"));

        let state = surface.into_state();
        let html = state.output.expect("output");
        assert!(html.as_str().contains("second"));
        assert!(!html.as_str().contains("first"));
    }

    #[test]
    fn error_clears_previous_output() {
        let surface = CollectingSurface::new();
        surface.replace_output(&CommonMarkRenderer::new().render("old"));
        surface.notify("heads up");
        surface.show_error("Parsing Data failed: boom");

        let state = surface.snapshot();
        assert_eq!(state.notifications, vec!["heads up".to_string()]);
        assert_eq!(state.error.as_deref(), Some("Parsing Data failed: boom"));
        assert!(state.output.is_none());
    }
}
