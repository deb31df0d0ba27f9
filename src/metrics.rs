use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    uploads_received: AtomicU64,
    summaries_rendered: AtomicU64,
    partial_extractions: AtomicU64,
    extraction_failures: AtomicU64,
    summarization_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an upload entering the pipeline.
    pub fn record_upload(&self) {
        self.uploads_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an extraction that stopped at the write limit.
    pub fn record_partial_extraction(&self) {
        self.partial_extractions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an extraction that failed outright.
    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summarization backend failure.
    pub fn record_summarization_failure(&self) {
        self.summarization_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that published rendered output.
    pub fn record_rendered(&self) {
        self.summaries_rendered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_received: self.uploads_received.load(Ordering::Relaxed),
            summaries_rendered: self.summaries_rendered.load(Ordering::Relaxed),
            partial_extractions: self.partial_extractions.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            summarization_failures: self.summarization_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Uploads that entered the pipeline since startup.
    pub uploads_received: u64,
    /// Runs that ended with rendered output on the display surface.
    pub summaries_rendered: u64,
    /// Extractions that hit the write limit and continued with partial text.
    pub partial_extractions: u64,
    /// Extractions that failed and aborted their run.
    pub extraction_failures: u64,
    /// Summarization requests that failed and aborted their run.
    pub summarization_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_outcome_independently() {
        let metrics = PipelineMetrics::new();
        metrics.record_upload();
        metrics.record_upload();
        metrics.record_partial_extraction();
        metrics.record_rendered();
        metrics.record_extraction_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.uploads_received, 2);
        assert_eq!(snapshot.partial_extractions, 1);
        assert_eq!(snapshot.summaries_rendered, 1);
        assert_eq!(snapshot.extraction_failures, 1);
        assert_eq!(snapshot.summarization_failures, 0);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(PipelineMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
