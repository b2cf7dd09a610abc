//! One-shot decision procedure run at the start of every build.
//!
//! The resolver reconciles the persisted active set with a fresh git probe:
//!
//! 1. No baseline output yet → `FIRST_BUILD`, nothing to isolate.
//! 2. Load the persisted state; a corrupt file is deleted → `CORRUPT_FILE`.
//! 3. Probe paths changed since the stored (or default) merge-base and union
//!    them into the stored set.
//! 4. An oversized set whose growth has stalled is reset → `TOO_MANY_PATHS`.
//! 5. A symbolic merge-base is pinned to its commit hash.
//! 6. Persist `{merge-base, union}`; extras are appended to the result only.
//! 7. Classify by comparing the union's size to the stored size.
//!
//! Only a probe failure is fatal, and it aborts before anything is saved.
//! Resets always fall back to compiling everything in the main unit.

use crate::config::{TurboConfig, TurboMode};
use crate::error::TurboResult;
use crate::state::{ActivePathSet, PersistedState, TurboReason, TurboState};
use crate::store::{ActivePathStore, LoadOutcome};
use convenient_git::ChangeProbe;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Resolves the active path set for one build invocation.
pub struct TurboResolver<P, S> {
    config: TurboConfig,
    probe: P,
    store: S,
}

impl<P: ChangeProbe, S: ActivePathStore> TurboResolver<P, S> {
    /// Combine configuration, a version control probe and a state store.
    pub fn new(config: TurboConfig, probe: P, store: S) -> Self {
        Self {
            config,
            probe,
            store,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &TurboConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve the active path set, or `None` when turbo builds are disabled.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TurboError::Git`] if probing fails and
    /// [`crate::TurboError::Store`] if the state file cannot be written.
    pub fn resolve(&mut self, mode: TurboMode) -> TurboResult<Option<TurboState>> {
        match mode {
            TurboMode::Disabled => {
                info!("Turbo builds disabled");
                Ok(None)
            }
            TurboMode::Enabled => self.resolve_enabled().map(Some),
        }
    }

    fn resolve_enabled(&mut self) -> TurboResult<TurboState> {
        // The fast unit compiles against the main unit's output.
        if is_directory_empty(&self.config.baseline_output_dir) {
            info!(
                "No prior build output in {}",
                self.config.baseline_output_dir.display()
            );
            return Ok(TurboState::empty(TurboReason::FirstBuild));
        }

        let (merge_base, mut paths) = match self.store.load()? {
            LoadOutcome::Missing => (self.config.default_merge_base.clone(), ActivePathSet::new()),
            LoadOutcome::Loaded(state) => (state.merge_base, state.paths),
            LoadOutcome::Corrupt(corruption) => {
                warn!(
                    "{} was invalid ({}); starting over from {}",
                    self.store.name(),
                    corruption,
                    self.config.default_merge_base
                );
                return Ok(TurboState::empty(TurboReason::CorruptFile));
            }
        };
        let previous_len = paths.len();

        let fresh: ActivePathSet = self.probe.changed_paths(&merge_base)?.into_iter().collect();
        debug!("Probe since {} reported {} paths", merge_base, fresh.len());
        paths.extend(fresh.iter().cloned());

        if self.config.limits.should_compact(paths.len(), fresh.len()) {
            warn!(
                "Active set reached {} paths with only {} changed since {}; resetting. The next build will be slower",
                paths.len(),
                fresh.len(),
                merge_base
            );
            self.store.reset()?;
            return Ok(TurboState::empty(TurboReason::TooManyPaths));
        }

        let merge_base = if merge_base == self.config.default_merge_base {
            let pinned = self.probe.resolve_ref(&merge_base)?;
            info!("Pinned merge-base {} to {}", merge_base, pinned);
            pinned
        } else {
            merge_base
        };

        let state = PersistedState { merge_base, paths };
        self.store.save(&state)?;

        let reason = if state.paths.len() == previous_len {
            TurboReason::PathsUnchanged
        } else {
            TurboReason::PathsChanged
        };
        info!(
            "{} active paths ({} before), {}",
            state.paths.len(),
            previous_len,
            reason
        );

        let mut result: Vec<String> = state.paths.into_iter().collect();
        result.extend(self.config.extra_paths.iter().cloned());
        Ok(TurboState::new(result, reason))
    }
}

/// True if `path` is absent, unreadable or has no entries.
pub fn is_directory_empty(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use convenient_git::{GitError, GitResult};
    use std::cell::RefCell;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    struct ScriptedProbe {
        changed: Vec<String>,
        probed: RefCell<Vec<String>>,
    }

    impl ScriptedProbe {
        fn new(changed: &[&str]) -> Self {
            Self {
                changed: changed.iter().map(|s| (*s).to_string()).collect(),
                probed: RefCell::new(Vec::new()),
            }
        }
    }

    impl ChangeProbe for ScriptedProbe {
        fn changed_paths(&self, merge_base: &str) -> GitResult<Vec<String>> {
            self.probed.borrow_mut().push(merge_base.to_string());
            Ok(self.changed.clone())
        }

        fn resolve_ref(&self, _reference: &str) -> GitResult<String> {
            Ok("0123abcd".to_string())
        }
    }

    struct BrokenProbe;

    impl ChangeProbe for BrokenProbe {
        fn changed_paths(&self, _merge_base: &str) -> GitResult<Vec<String>> {
            Err(GitError::InvalidOutput("git diff".to_string()))
        }

        fn resolve_ref(&self, reference: &str) -> GitResult<String> {
            Err(GitError::EmptyRevision(reference.to_string()))
        }
    }

    fn built_baseline() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Main.class"), b"cafebabe").unwrap();
        temp
    }

    fn config(baseline: &TempDir) -> TurboConfig {
        TurboConfig::new(baseline.path(), "unused-by-memory-store")
    }

    #[test]
    fn test_is_directory_empty() {
        let temp = TempDir::new().unwrap();
        assert!(is_directory_empty(&temp.path().join("missing")));
        assert!(is_directory_empty(temp.path()));
        fs::write(temp.path().join("A.class"), b"").unwrap();
        assert!(!is_directory_empty(temp.path()));
    }

    #[test]
    fn test_disabled_does_nothing() {
        let baseline = built_baseline();
        let probe = ScriptedProbe::new(&["A.java"]);
        let mut resolver = TurboResolver::new(config(&baseline), &probe, MemoryStore::new());

        assert_eq!(resolver.resolve(TurboMode::Disabled).unwrap(), None);
        assert!(probe.probed.borrow().is_empty());
        assert_eq!(resolver.store().contents(), None);
    }

    #[test]
    fn test_first_run_pins_default_merge_base() {
        let baseline = built_baseline();
        let probe = ScriptedProbe::new(&["b/B.java", "a/A.java"]);
        let mut resolver = TurboResolver::new(config(&baseline), &probe, MemoryStore::new());

        let state = resolver.resolve(TurboMode::Enabled).unwrap().unwrap();
        assert_eq!(state.reason, TurboReason::PathsChanged);
        assert_eq!(state.paths, vec!["a/A.java", "b/B.java"]);
        assert_eq!(probe.probed.borrow().as_slice(), ["origin/main"]);
        assert_eq!(
            resolver.store().contents(),
            Some("mergebase=0123abcd\na/A.java\nb/B.java\n")
        );
    }

    #[test]
    fn test_pinned_merge_base_is_reused() {
        let baseline = built_baseline();
        let probe = ScriptedProbe::new(&["A.java"]);
        let store = MemoryStore::with_contents("mergebase=feedface\nA.java\n");
        let mut resolver = TurboResolver::new(config(&baseline), &probe, store);

        let state = resolver.resolve(TurboMode::Enabled).unwrap().unwrap();
        assert_eq!(state.reason, TurboReason::PathsUnchanged);
        assert_eq!(probe.probed.borrow().as_slice(), ["feedface"]);
        assert_eq!(
            resolver.store().contents(),
            Some("mergebase=feedface\nA.java\n")
        );
    }

    #[test]
    #[traced_test]
    fn test_corrupt_state_is_reported_and_logged() {
        let baseline = built_baseline();
        let probe = ScriptedProbe::new(&["A.java"]);
        let store = MemoryStore::with_contents("notamergebase\nA.java\n");
        let mut resolver = TurboResolver::new(config(&baseline), &probe, store);

        let state = resolver.resolve(TurboMode::Enabled).unwrap().unwrap();
        assert_eq!(state, TurboState::empty(TurboReason::CorruptFile));
        assert_eq!(resolver.store().contents(), None);
        assert!(logs_contain("was invalid"));
    }

    #[test]
    #[traced_test]
    fn test_compaction_is_logged() {
        let baseline = built_baseline();
        let stored: Vec<String> = (0..201).map(|i| format!("p/F{i:03}.java")).collect();
        let store = MemoryStore::with_contents(format!("mergebase=abc\n{}\n", stored.join("\n")));
        let probe = ScriptedProbe::new(&["new/N1.java", "new/N2.java"]);
        let mut resolver = TurboResolver::new(config(&baseline), &probe, store);

        let state = resolver.resolve(TurboMode::Enabled).unwrap().unwrap();
        assert_eq!(state, TurboState::empty(TurboReason::TooManyPaths));
        assert_eq!(resolver.store().contents(), None);
        assert!(logs_contain("The next build will be slower"));
    }

    #[test]
    fn test_probe_failure_persists_nothing() {
        let baseline = built_baseline();
        let store = MemoryStore::with_contents("mergebase=abc\nA.java\n");
        let mut resolver = TurboResolver::new(config(&baseline), BrokenProbe, store);

        let err = resolver.resolve(TurboMode::Enabled).unwrap_err();
        assert!(matches!(err, crate::TurboError::Git(_)));
        assert_eq!(resolver.store().contents(), Some("mergebase=abc\nA.java\n"));
        assert_eq!(resolver.store().save_count(), 0);
    }

    #[test]
    fn test_extras_are_appended_but_not_saved() {
        let baseline = built_baseline();
        let probe = ScriptedProbe::new(&["b/B.java"]);
        let config = config(&baseline).with_extra_paths(["x/**/*.java"]);
        let mut resolver = TurboResolver::new(config, &probe, MemoryStore::new());

        let state = resolver.resolve(TurboMode::Enabled).unwrap().unwrap();
        assert_eq!(state.paths, vec!["b/B.java", "x/**/*.java"]);
        assert_eq!(
            resolver.store().contents(),
            Some("mergebase=0123abcd\nb/B.java\n")
        );
    }
}
