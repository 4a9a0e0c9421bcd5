use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Counters accumulated over the lifetime of a coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames_ingested: usize,
    pub frames_skipped: usize,
    pub samples_rejected: usize,
    pub analysis_passes: usize,
    pub stale_results: usize,
    pub records_submitted: usize,
    pub submit_failures: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_ingested(&self) {
        self.update(|m| m.frames_ingested += 1);
    }

    pub fn record_skipped(&self) {
        self.update(|m| m.frames_skipped += 1);
    }

    pub fn record_rejected(&self) {
        self.update(|m| m.samples_rejected += 1);
    }

    pub fn record_analysis(&self) {
        self.update(|m| m.analysis_passes += 1);
    }

    pub fn record_stale(&self) {
        self.update(|m| m.stale_results += 1);
    }

    pub fn record_submitted(&self) {
        self.update(|m| m.records_submitted += 1);
    }

    pub fn record_submit_failure(&self) {
        self.update(|m| m.submit_failures += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
