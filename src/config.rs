use std::path::PathBuf;

/// Queue capacity between pipeline stages. Larger values let stages run at
/// different speeds at the expense of memory.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Minimum number of identical files for a group to be reported.
pub const DEFAULT_THRESHOLD: usize = 2;

/// Configuration for a duplicate-finding run.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Root directories to scan.
    pub roots: Vec<PathBuf>,
    /// Minimum group size to report. Values below 1 behave as 1.
    pub threshold: usize,
    /// Record recoverable errors and continue instead of aborting.
    pub keep_going: bool,
    /// Capacity of each inter-stage queue.
    pub channel_capacity: usize,
    /// Concurrent directory walkers.
    pub walker_limit: usize,
    /// Concurrent hashing workers.
    pub hasher_limit: usize,
    /// Reorder the hasher input so larger files are hashed first.
    pub prioritize_by_size: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            threshold: DEFAULT_THRESHOLD,
            keep_going: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            walker_limit: default_walker_limit(),
            hasher_limit: default_hasher_limit(),
            prioritize_by_size: true,
        }
    }
}

/// Default hasher cap: one per hardware thread.
pub fn default_hasher_limit() -> usize {
    num_cpus::get()
}

/// Default walker cap. Walkers spend most of their time blocked in
/// filesystem calls, so the cap is a high multiple of the core count.
pub fn default_walker_limit() -> usize {
    8 * num_cpus::get()
}
