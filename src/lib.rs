//! find-duplicates: identify groups of files with identical byte contents.
//!
//! The work happens in a concurrent pipeline: a bounded pool of walkers
//! discovers regular files, a deduplication stage drops repeated
//! observations, a size filter prunes files that cannot have a duplicate
//! without reading them, a hasher pool fingerprints the survivors, and an
//! aggregator groups paths by fingerprint. Bounded queues between the
//! stages provide backpressure; a supervisor consumes a shared error
//! channel and decides between fail-fast and keep-going.

pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod walker;

pub use config::FinderConfig;
pub use error::{ErrorAction, FindError};
pub use fingerprint::Fingerprint;
pub use pipeline::{DupFinder, DuplicateGroups};
pub use stats::StatisticsSnapshot;
