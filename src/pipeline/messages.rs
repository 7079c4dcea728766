//! Messages handed between pipeline stages.
//!
//! Queue handoff transfers ownership: a message belongs to exactly one stage
//! at a time.

use std::path::PathBuf;

use crate::fingerprint::Fingerprint;

/// A regular file and the size reported when it was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathWithSize {
    pub path: PathBuf,
    pub size: u64,
}

/// A regular file and the fingerprint of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathWithHash {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}
