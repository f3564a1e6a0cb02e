//! Fire-and-forget metrics sink port.
//!
//! The engine emits named-counter increments as a telemetry side effect; the
//! sink is an external collaborator and must never block or fail an analysis,
//! so the trait is infallible by construction. [`NullMetrics`] is the default
//! sink; [`RecordingMetrics`] captures counters in memory for tests.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Counter names emitted by the analysis engine.
pub mod counters {
    pub const UNCHANGED_FILES: &str = "content_analysis.unchanged_files";
    pub const MODIFIED_FILES: &str = "content_analysis.modified_files";
    pub const COMMON_DIR_DIFFS: &str = "content_analysis.common_dir_diffs";
    pub const BUILD_KEY_CHANGES: &str = "content_analysis.build_key_changes";
    pub const DEVICE_IMAGE_CHANGES: &str = "content_analysis.device_image_changes";
    pub const ABORTED_CONTEXTS: &str = "content_analysis.aborted_contexts";
    pub const ANALYSIS_FAILURES: &str = "content_analysis.failures";
}

/// Accepts named-counter increments.
pub trait MetricsSink: Send + Sync {
    fn incr(&self, counter: &str, delta: u64);
}

/// Discards every increment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn incr(&self, _counter: &str, _delta: u64) {}
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl RecordingMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one counter (0 when never incremented).
    #[must_use]
    pub fn get(&self, counter: &str) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.get(counter).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Snapshot of all counters, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl MetricsSink for RecordingMetrics {
    fn incr(&self, counter: &str, delta: u64) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(counter.to_string()).or_insert(0) += delta;
        }
    }
}
