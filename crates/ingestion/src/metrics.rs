//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Observations delivered by readers
    pub observations_read: AtomicU64,

    /// Normalized records handed back for the sink
    pub records_emitted: AtomicU64,

    /// Observations dropped for falling outside their window
    pub records_out_of_window: AtomicU64,

    /// Jobs that found no input
    pub missing_windows: AtomicU64,

    /// Jobs that failed on malformed input
    pub corrupt_windows: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self, count: usize) {
        self.observations_read
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_emitted(&self, count: usize) {
        self.records_emitted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_out_of_window(&self, count: usize) {
        self.records_out_of_window
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.missing_windows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corrupt(&self) {
        self.corrupt_windows.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            observations_read: self.observations_read.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            records_out_of_window: self.records_out_of_window.load(Ordering::Relaxed),
            missing_windows: self.missing_windows.load(Ordering::Relaxed),
            corrupt_windows: self.corrupt_windows.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub observations_read: u64,
    pub records_emitted: u64,
    pub records_out_of_window: u64,
    pub missing_windows: u64,
    pub corrupt_windows: u64,
}
