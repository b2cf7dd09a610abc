//! Error types for turbo path resolution

use convenient_git::GitError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the persisted state backend.
///
/// A state file that merely fails to parse is not an error; see
/// [`crate::LoadOutcome::Corrupt`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading, writing or deleting the state file failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The temporary file could not be renamed over the state file.
    #[error("Failed to replace {path}: {source}")]
    Persist {
        /// Destination state file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Fatal resolution failures.
#[derive(Debug, Error)]
pub enum TurboError {
    /// Probing version control failed. Nothing was persisted.
    #[error("Change detection failed: {0}")]
    Git(#[from] GitError),

    /// The state file could not be written or removed.
    #[error("Active path store failed: {0}")]
    Store(#[from] StoreError),
}

/// Result type for resolution
pub type TurboResult<T> = Result<T, TurboError>;
