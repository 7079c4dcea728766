use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the pipeline.
#[derive(Debug, Error)]
pub enum FindError {
    /// An OS error from walking, stat, open, or read, tagged with the path
    /// that produced it.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid flag combination or bad path, detected before the pipeline
    /// starts.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A pipeline invariant was violated. Should be unreachable.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl FindError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// What the supervisor should do with an error handed to the error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Abort the run and return this error (fail-fast).
    Stop,
    /// Record the error and keep going.
    Continue,
}
