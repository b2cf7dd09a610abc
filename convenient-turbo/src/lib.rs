//! Active path tracking for turbo builds.
//!
//! A turbo build compiles recently modified sources as a separate, fast unit
//! while the rest of the tree keeps using the output of the last full build.
//! This crate decides, once per build, which sources belong in the fast unit.
//!
//! - [`TurboResolver`] runs the decision and returns a [`TurboState`]
//! - [`ActivePathStore`] persists the active set between builds
//!   ([`FileStore`] on disk, [`MemoryStore`] for tests)
//! - [`convenient_git::ChangeProbe`] reports what changed since the merge-base
//!
//! The active set only grows within a merge-base epoch. Deleting the state
//! file starts a new epoch. Corrupt state and oversized sets reset themselves
//! and fall back to a full (slower) build.
//!
//! # Example
//!
//! ```no_run
//! use convenient_git::SystemGit;
//! use convenient_turbo::{FileStore, TurboConfig, TurboMode, TurboResolver};
//!
//! # fn example() -> Result<(), convenient_turbo::TurboError> {
//! let config = TurboConfig::new("build/classes/java/main", "build/turbo-paths.txt");
//! let probe = SystemGit::new(".", config.path_filter());
//! let store = FileStore::new(&config.state_file);
//!
//! let mut resolver = TurboResolver::new(config, probe, store);
//! if let Some(state) = resolver.resolve(TurboMode::from_flag(true))? {
//!     println!("Turbo: {}", state.summary("turbo-paths.txt"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod resolver;
pub mod state;
pub mod store;

pub use config::{
    DEFAULT_EXTENSION, DEFAULT_MAX_ACTIVE_PATHS, DEFAULT_MERGE_BASE, DEFAULT_MIN_FRESH_PATHS,
    DEFAULT_PATH_PREFIX, DEFAULT_STATE_FILE_NAME, TurboConfig, TurboLimits, TurboMode,
};
pub use error::{StoreError, StoreResult, TurboError, TurboResult};
pub use resolver::{TurboResolver, is_directory_empty};
pub use state::{
    ActivePathSet, Corruption, MERGE_BASE_KEY, MergeBaseRef, PersistedState, TurboReason,
    TurboState,
};
pub use store::{ActivePathStore, FileStore, LoadOutcome, MemoryStore};
