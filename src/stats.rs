//! Run statistics.
//!
//! Counters are updated from every stage of the pipeline, so each one lives
//! in its own cache line to avoid false sharing between workers on different
//! cores.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;
use serde::Serialize;

/// Monotonic counters shared across the pipeline.
#[derive(Debug, Default)]
pub struct Statistics {
    /// Errors seen by the supervisor.
    pub errors: CachePadded<AtomicU64>,
    /// Directory entries listed, regular or not.
    pub dir_entries: CachePadded<AtomicU64>,
    /// Regular files discovered.
    pub files: CachePadded<AtomicU64>,
    /// Files actually opened for hashing.
    pub files_opened: CachePadded<AtomicU64>,
    /// Sum of discovered file sizes.
    pub total_bytes: CachePadded<AtomicU64>,
    /// Bytes actually read while hashing.
    pub bytes_hashed: CachePadded<AtomicU64>,
    /// Distinct file sizes observed by the size filter.
    pub unique_sizes: CachePadded<AtomicU64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let errors = self.errors.load(Ordering::Relaxed);
        let dir_entries = self.dir_entries.load(Ordering::Relaxed);
        let files = self.files.load(Ordering::Relaxed);
        let files_opened = self.files_opened.load(Ordering::Relaxed);
        let total_bytes = self.total_bytes.load(Ordering::Relaxed);
        let bytes_hashed = self.bytes_hashed.load(Ordering::Relaxed);
        let unique_sizes = self.unique_sizes.load(Ordering::Relaxed);

        StatisticsSnapshot {
            errors,
            dir_entries,
            files,
            files_opened,
            files_opened_percent: percent(files_opened, files),
            total_bytes,
            bytes_hashed,
            bytes_hashed_percent: percent(bytes_hashed, total_bytes),
            unique_sizes,
        }
    }
}

/// The guard avoids a divide-by-zero when no files were found.
fn percent(numerator: u64, denominator: u64) -> f64 {
    100.0 * numerator as f64 / denominator.max(1) as f64
}

/// A consistent-enough copy of [`Statistics`], shaped for JSON output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub errors: u64,
    pub dir_entries: u64,
    pub files: u64,
    pub files_opened: u64,
    pub files_opened_percent: f64,
    pub total_bytes: u64,
    pub bytes_hashed: u64,
    pub bytes_hashed_percent: f64,
    pub unique_sizes: u64,
}
