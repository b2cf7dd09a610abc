//! Data model: persisted active path state and per-build results.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Diff baseline: a symbolic reference (`origin/main`) or a commit hash.
pub type MergeBaseRef = String;

/// Source paths currently compiled in the fast unit.
///
/// Ordered so that persistence is deterministic.
pub type ActivePathSet = BTreeSet<String>;

/// Prefix of the first line of the state file.
pub const MERGE_BASE_KEY: &str = "mergebase=";

/// Why a state file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Corruption {
    /// The file has no content at all.
    #[error("file is empty")]
    Empty,

    /// The first line is not `mergebase=<ref>`.
    #[error("expected `mergebase=<ref>` on the first line, found `{first_line}`")]
    MissingMergeBase {
        /// The offending line.
        first_line: String,
    },

    /// `mergebase=` with nothing after it.
    #[error("merge-base reference is empty")]
    EmptyMergeBase,

    /// The file exists but could not be read as text.
    #[error("unreadable: {0}")]
    Unreadable(String),
}

/// Tracking state carried between builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    /// Epoch the active set is relative to.
    pub merge_base: MergeBaseRef,
    /// Paths accumulated during this epoch.
    pub paths: ActivePathSet,
}

impl PersistedState {
    /// Create a state from a merge-base and any iterable of paths.
    pub fn new(
        merge_base: impl Into<MergeBaseRef>,
        paths: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            merge_base: merge_base.into(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Text form: `mergebase=<ref>` followed by one sorted path per line.
    pub fn to_text(&self) -> String {
        let mut text = format!("{MERGE_BASE_KEY}{}\n", self.merge_base);
        for path in &self.paths {
            text.push_str(path);
            text.push('\n');
        }
        text
    }

    /// Parse the text form. Never returns partially parsed data.
    ///
    /// # Errors
    ///
    /// Returns the [`Corruption`] found when the header is missing or empty.
    pub fn parse(text: &str) -> Result<Self, Corruption> {
        let mut lines = text.lines();
        let first_line = lines.next().ok_or(Corruption::Empty)?;

        let merge_base = first_line
            .trim_end()
            .strip_prefix(MERGE_BASE_KEY)
            .ok_or_else(|| Corruption::MissingMergeBase {
                first_line: first_line.to_string(),
            })?
            .trim();
        if merge_base.is_empty() {
            return Err(Corruption::EmptyMergeBase);
        }

        let paths = lines
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            merge_base: merge_base.to_string(),
            paths,
        })
    }
}

/// Reason code attached to every resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurboReason {
    /// No prior full-build output exists.
    FirstBuild,
    /// The active set differs in size from the previous build.
    PathsChanged,
    /// The active set is the same as in the previous build.
    PathsUnchanged,
    /// The state file was invalid and has been deleted.
    CorruptFile,
    /// The active set grew too large and has been reset.
    TooManyPaths,
}

impl TurboReason {
    /// Whether this reason comes from a self-healing reset.
    pub fn is_reset(self) -> bool {
        matches!(self, Self::CorruptFile | Self::TooManyPaths)
    }
}

impl fmt::Display for TurboReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::FirstBuild => "FIRST_BUILD",
            Self::PathsChanged => "PATHS_CHANGED",
            Self::PathsUnchanged => "PATHS_UNCHANGED",
            Self::CorruptFile => "CORRUPT_FILE",
            Self::TooManyPaths => "TOO_MANY_PATHS",
        };
        f.write_str(code)
    }
}

/// Outcome of one resolution, handed to the compilation-unit splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurboState {
    /// Sorted active paths followed by any per-invocation extras.
    pub paths: Vec<String>,
    /// How the paths were arrived at.
    pub reason: TurboReason,
}

impl TurboState {
    /// Create a state.
    pub fn new(paths: Vec<String>, reason: TurboReason) -> Self {
        Self { paths, reason }
    }

    /// A state with no active paths: everything compiles in the main unit.
    pub fn empty(reason: TurboReason) -> Self {
        Self::new(Vec::new(), reason)
    }

    /// True when there is a separate fast unit to compile.
    pub fn is_active(&self) -> bool {
        !self.paths.is_empty()
    }

    /// One-line message for the build log.
    pub fn summary(&self, state_file_name: &str) -> String {
        match self.reason {
            TurboReason::FirstBuild => "First build detected. Build will be slow.".to_string(),
            TurboReason::PathsChanged => {
                "Paths in active set have changed. Build will be slow.".to_string()
            }
            TurboReason::PathsUnchanged => format!(
                "Paths unchanged. Size={}. Build should be fast!",
                self.paths.len()
            ),
            TurboReason::CorruptFile => {
                format!("{state_file_name} was invalid. Build will be slow.")
            }
            TurboReason::TooManyPaths => "Paths were compacted. Build will be slow.".to_string(),
        }
    }
}
