//! Tracing setup and run counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed (tests, embedding binaries)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Counters for one pipeline run
#[derive(Debug, Default)]
pub struct RunMetrics {
    locales_updated: AtomicU64,
    locales_unchanged: AtomicU64,
    fetch_failures: AtomicU64,
    write_failures: AtomicU64,
    records_appended: AtomicU64,
    files_written: AtomicU64,
    files_unchanged: AtomicU64,
    quarantined: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locale_updated(&self, appended: usize) {
        self.locales_updated.fetch_add(1, Ordering::Relaxed);
        self.records_appended.fetch_add(appended as u64, Ordering::Relaxed);
        tracing::debug!(counter = "locales_updated", appended, "Metric incremented");
    }

    pub fn locale_unchanged(&self) {
        self.locales_unchanged.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "locales_unchanged", "Metric incremented");
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "fetch_failures", "Metric incremented");
    }

    pub fn write_failed(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "write_failures", "Metric incremented");
    }

    pub fn quarantined(&self) {
        self.quarantined.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "quarantined", "Metric incremented");
    }

    /// Record the outcome of a batch of file writes
    pub fn files(&self, written: usize, unchanged: usize, failed: usize) {
        self.files_written.fetch_add(written as u64, Ordering::Relaxed);
        self.files_unchanged.fetch_add(unchanged as u64, Ordering::Relaxed);
        self.write_failures.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            locales_updated: self.locales_updated.load(Ordering::Relaxed),
            locales_unchanged: self.locales_unchanged.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            records_appended: self.records_appended.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            files_unchanged: self.files_unchanged.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub locales_updated: u64,
    pub locales_unchanged: u64,
    pub fetch_failures: u64,
    pub write_failures: u64,
    pub records_appended: u64,
    pub files_written: u64,
    pub files_unchanged: u64,
    pub quarantined: u64,
}

impl MetricsSnapshot {
    pub fn failures(&self) -> u64 {
        self.fetch_failures + self.write_failures
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "locales updated: {}, unchanged: {}, records appended: {}, files written: {}, unchanged: {}, \
             fetch failures: {}, write failures: {}, quarantined: {}",
            self.locales_updated,
            self.locales_unchanged,
            self.records_appended,
            self.files_written,
            self.files_unchanged,
            self.fetch_failures,
            self.write_failures,
            self.quarantined
        )
    }
}
