//! Persistence of the active path set between builds.
//!
//! The state behaves like a manually invalidated cache: it is only ever
//! replaced wholesale ([`ActivePathStore::save`]) or dropped
//! ([`ActivePathStore::reset`]). Both backends run the same parser, so
//! corruption is detected identically.

use crate::error::{StoreError, StoreResult};
use crate::state::{Corruption, PersistedState};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Result of reading the persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing has been persisted yet.
    Missing,
    /// A valid state.
    Loaded(PersistedState),
    /// The state was invalid. It has already been deleted.
    Corrupt(Corruption),
}

/// Load/save contract for the tracking state.
pub trait ActivePathStore {
    /// Read the current state. Invalid state is deleted before
    /// [`LoadOutcome::Corrupt`] is returned.
    ///
    /// # Errors
    ///
    /// Fails only if invalid state cannot be deleted.
    fn load(&mut self) -> StoreResult<LoadOutcome>;

    /// Replace the persisted state. A crash part-way through leaves either
    /// the old state or the new one, never a mix.
    ///
    /// # Errors
    ///
    /// Fails if the state cannot be written.
    fn save(&mut self, state: &PersistedState) -> StoreResult<()>;

    /// Drop the persisted state. Absent state is not an error.
    ///
    /// # Errors
    ///
    /// Fails if existing state cannot be deleted.
    fn reset(&mut self) -> StoreResult<()>;

    /// Short name used in user-facing messages.
    fn name(&self) -> String;
}

/// Plain text state file, e.g. `build/turbo-paths.txt`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store state at `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn discard(&mut self, corruption: Corruption) -> StoreResult<LoadOutcome> {
        warn!(
            "Discarding invalid state file {}: {}",
            self.path.display(),
            corruption
        );
        self.reset()?;
        Ok(LoadOutcome::Corrupt(corruption))
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl ActivePathStore for FileStore {
    fn load(&mut self) -> StoreResult<LoadOutcome> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}", self.path.display());
                return Ok(LoadOutcome::Missing);
            }
            Err(e) => return self.discard(Corruption::Unreadable(e.to_string())),
        };

        let parsed = String::from_utf8(bytes)
            .map_err(|_| Corruption::Unreadable("not valid UTF-8".to_string()))
            .and_then(|text| PersistedState::parse(&text));

        match parsed {
            Ok(state) => {
                debug!(
                    "Loaded {} active paths (mergebase={}) from {}",
                    state.paths.len(),
                    state.merge_base,
                    self.path.display()
                );
                Ok(LoadOutcome::Loaded(state))
            }
            Err(corruption) => self.discard(corruption),
        }
    }

    fn save(&mut self, state: &PersistedState) -> StoreResult<()> {
        let parent = self.parent_dir().to_path_buf();
        fs::create_dir_all(&parent).map_err(StoreError::io(&parent))?;

        // Exclusively created next to the target so the rename stays on one
        // filesystem.
        let mut temp = NamedTempFile::new_in(&parent).map_err(StoreError::io(&parent))?;
        temp.write_all(state.to_text().as_bytes())
            .map_err(StoreError::io(temp.path()))?;
        temp.as_file()
            .sync_all()
            .map_err(StoreError::io(temp.path()))?;

        let _ = temp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        // Best effort: not every filesystem supports syncing a directory.
        if let Ok(dir) = File::open(&parent) {
            let _ = dir.sync_all();
        }

        debug!(
            "Saved {} active paths (mergebase={}) to {}",
            state.paths.len(),
            state.merge_base,
            self.path.display()
        );
        Ok(())
    }

    fn reset(&mut self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

/// In-memory store holding the serialized text.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Option<String>,
    saves: usize,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw text, valid or not.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
            saves: 0,
        }
    }

    /// Current serialized text, if any.
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ActivePathStore for MemoryStore {
    fn load(&mut self) -> StoreResult<LoadOutcome> {
        let Some(text) = self.contents.as_deref() else {
            return Ok(LoadOutcome::Missing);
        };
        match PersistedState::parse(text) {
            Ok(state) => Ok(LoadOutcome::Loaded(state)),
            Err(corruption) => {
                warn!("Discarding invalid in-memory state: {}", corruption);
                self.contents = None;
                Ok(LoadOutcome::Corrupt(corruption))
            }
        }
    }

    fn save(&mut self, state: &PersistedState) -> StoreResult<()> {
        self.contents = Some(state.to_text());
        self.saves += 1;
        Ok(())
    }

    fn reset(&mut self) -> StoreResult<()> {
        self.contents = None;
        Ok(())
    }

    fn name(&self) -> String {
        "in-memory state".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> PersistedState {
        PersistedState::new("abc123", ["b/B.java", "a/A.java", "c/C.java"])
    }

    #[test]
    fn test_file_store_missing_file() {
        let temp = TempDir::new().unwrap();
        let mut store = FileStore::new(temp.path().join("turbo-paths.txt"));
        assert_eq!(store.load().unwrap(), LoadOutcome::Missing);
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut store = FileStore::new(temp.path().join("turbo-paths.txt"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), LoadOutcome::Loaded(sample()));
    }

    #[test]
    fn test_file_store_writes_sorted_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("turbo-paths.txt");
        let mut store = FileStore::new(&path);

        store.save(&sample()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "mergebase=abc123\na/A.java\nb/B.java\nc/C.java\n"
        );
    }

    #[test]
    fn test_file_store_overwrites_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("turbo-paths.txt");
        let mut store = FileStore::new(&path);

        store.save(&sample()).unwrap();
        store
            .save(&PersistedState::new("def456", ["z/Z.java"]))
            .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "mergebase=def456\nz/Z.java\n"
        );
        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build").join("nested").join("turbo-paths.txt");
        let mut store = FileStore::new(&path);

        store.save(&sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_store_corrupt_header_deletes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("turbo-paths.txt");
        fs::write(&path, "notamergebase\nA.java\n").unwrap();
        let mut store = FileStore::new(&path);

        let outcome = store.load().unwrap();
        assert!(matches!(
            outcome,
            LoadOutcome::Corrupt(Corruption::MissingMergeBase { .. })
        ));
        assert!(!path.exists());
        assert_eq!(store.load().unwrap(), LoadOutcome::Missing);
    }

    #[test]
    fn test_file_store_empty_and_binary_files_are_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("turbo-paths.txt");
        let mut store = FileStore::new(&path);

        fs::write(&path, "").unwrap();
        assert_eq!(store.load().unwrap(), LoadOutcome::Corrupt(Corruption::Empty));
        assert!(!path.exists());

        fs::write(&path, [0xff, 0xfe, 0x00, 0x01]).unwrap();
        assert!(matches!(
            store.load().unwrap(),
            LoadOutcome::Corrupt(Corruption::Unreadable(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_reset_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("turbo-paths.txt");
        let mut store = FileStore::new(&path);

        store.save(&sample()).unwrap();
        store.reset().unwrap();
        assert!(!path.exists());
        store.reset().unwrap();
    }

    #[test]
    fn test_file_store_name() {
        let store = FileStore::new("build/turbo-paths.txt");
        assert_eq!(store.name(), "turbo-paths.txt");
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), LoadOutcome::Missing);

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), LoadOutcome::Loaded(sample()));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_memory_store_detects_corruption_like_file_store() {
        let mut store = MemoryStore::with_contents("notamergebase\nA.java\n");

        assert!(matches!(
            store.load().unwrap(),
            LoadOutcome::Corrupt(Corruption::MissingMergeBase { .. })
        ));
        assert_eq!(store.contents(), None);
    }
}
