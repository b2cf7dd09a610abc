//! Configuration for turbo path resolution.

use convenient_git::PathFilter;
use std::path::PathBuf;

/// Above this many active paths a stagnating set is reset.
pub const DEFAULT_MAX_ACTIVE_PATHS: usize = 200;

/// A probe reporting fewer fresh paths than this counts as stagnating.
pub const DEFAULT_MIN_FRESH_PATHS: usize = 40;

/// Symbolic merge-base used until an epoch is pinned.
pub const DEFAULT_MERGE_BASE: &str = "origin/main";

/// Source root, relative to the repository.
pub const DEFAULT_PATH_PREFIX: &str = "src/main/java/";

/// Source file extension.
pub const DEFAULT_EXTENSION: &str = ".java";

/// File name of the tracking state.
pub const DEFAULT_STATE_FILE_NAME: &str = "turbo-paths.txt";

/// Size bound on the active path set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurboLimits {
    /// Largest active set kept without compaction.
    pub max_active_paths: usize,
    /// Minimum probe size that still counts as active growth.
    pub min_fresh_paths: usize,
}

impl Default for TurboLimits {
    fn default() -> Self {
        Self {
            max_active_paths: DEFAULT_MAX_ACTIVE_PATHS,
            min_fresh_paths: DEFAULT_MIN_FRESH_PATHS,
        }
    }
}

impl TurboLimits {
    /// True when the set is over the bound and the probe shows growth has
    /// stalled.
    pub fn should_compact(&self, total_paths: usize, fresh_paths: usize) -> bool {
        total_paths > self.max_active_paths && fresh_paths < self.min_fresh_paths
    }
}

/// Whether turbo builds run at all, decided once per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurboMode {
    /// Resolve an active path set.
    Enabled,
    /// Compile everything in the main unit.
    Disabled,
}

impl TurboMode {
    /// Map an on/off flag.
    pub fn from_flag(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    /// True for [`TurboMode::Enabled`].
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

/// Inputs to [`crate::TurboResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurboConfig {
    /// Source root stripped from changed paths.
    pub path_prefix: String,
    /// Extension a changed path must carry.
    pub extension: String,
    /// Appended to every result, never persisted.
    pub extra_paths: Vec<String>,
    /// Output of the last full build; turbo needs it as a baseline.
    pub baseline_output_dir: PathBuf,
    /// Location of the tracking state.
    pub state_file: PathBuf,
    /// Reference diffed against until an epoch is pinned.
    pub default_merge_base: String,
    /// Compaction thresholds.
    pub limits: TurboLimits,
}

impl TurboConfig {
    /// Defaults for a Java source tree with the given baseline output
    /// directory and state file.
    pub fn new(baseline_output_dir: impl Into<PathBuf>, state_file: impl Into<PathBuf>) -> Self {
        Self {
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            extra_paths: Vec::new(),
            baseline_output_dir: baseline_output_dir.into(),
            state_file: state_file.into(),
            default_merge_base: DEFAULT_MERGE_BASE.to_string(),
            limits: TurboLimits::default(),
        }
    }

    /// Set the source root prefix.
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Set the source file extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the per-invocation extra paths.
    #[must_use]
    pub fn with_extra_paths(mut self, extra: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_paths = extra.into_iter().map(Into::into).collect();
        self
    }

    /// Set the symbolic default merge-base.
    #[must_use]
    pub fn with_default_merge_base(mut self, merge_base: impl Into<String>) -> Self {
        self.default_merge_base = merge_base.into();
        self
    }

    /// Override the compaction thresholds.
    #[must_use]
    pub fn with_limits(mut self, limits: TurboLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Filter selecting this tree's sources from git output.
    pub fn path_filter(&self) -> PathFilter {
        PathFilter::new(self.path_prefix.clone(), self.extension.clone())
    }
}
