//! Change detection against a git merge-base.
//!
//! This crate is the only place that talks to version control. It exposes a
//! narrow synchronous port, [`ChangeProbe`], with two operations:
//!
//! - list the source paths changed in the working tree since a merge-base
//! - resolve a symbolic reference (e.g. `origin/main`) to a commit hash
//!
//! [`SystemGit`] implements the port by spawning the `git` binary. Callers that
//! need determinism (tests, dry runs) provide their own implementation.
//!
//! # Example
//!
//! ```no_run
//! use convenient_git::{ChangeProbe, PathFilter, SystemGit};
//!
//! # fn example() -> Result<(), convenient_git::GitError> {
//! let git = SystemGit::new(".", PathFilter::new("src/main/java/", ".java"));
//! let base = git.resolve_ref("origin/main")?;
//! for path in git.changed_paths(&base)? {
//!     println!("{path}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod filter;
mod system_git;

pub use filter::PathFilter;
pub use system_git::SystemGit;

use std::process::ExitStatus;

/// Errors raised while querying git.
///
/// Every variant is fatal for the caller: a failed probe must never be
/// replaced by stale or assumed data.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The git process could not be started at all.
    #[error("Failed to execute `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The git process ran but exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The process succeeded but its output was not valid UTF-8.
    #[error("`{0}` produced output that is not valid UTF-8")]
    InvalidOutput(String),

    /// `rev-parse` succeeded but printed nothing.
    #[error("Reference {0} resolved to an empty revision")]
    EmptyRevision(String),
}

/// Result type for git operations
pub type GitResult<T> = Result<T, GitError>;

/// Synchronous port onto version control.
///
/// Implementations must not retry and must not fall back to cached answers:
/// any failure is returned as-is.
pub trait ChangeProbe {
    /// Paths changed in the working tree relative to the merge-base of
    /// `merge_base` and `HEAD`, already filtered and with the source prefix
    /// stripped.
    fn changed_paths(&self, merge_base: &str) -> GitResult<Vec<String>>;

    /// Resolve `reference` to a concrete commit hash.
    fn resolve_ref(&self, reference: &str) -> GitResult<String>;
}

impl<P: ChangeProbe + ?Sized> ChangeProbe for &P {
    fn changed_paths(&self, merge_base: &str) -> GitResult<Vec<String>> {
        (**self).changed_paths(merge_base)
    }

    fn resolve_ref(&self, reference: &str) -> GitResult<String> {
        (**self).resolve_ref(reference)
    }
}
