//! Shared in-memory cache index

use super::entry::CacheEntry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Handle to an in-memory cache index shared between caches
///
/// Cloning the handle shares the same mapping. Every access holds the
/// internal mutex only for the duration of the map operation; file I/O is
/// done by the caller outside the lock.
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    inner: Arc<Mutex<IndexState>>,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<String, CacheEntry>,
    /// Cache directories whose index file has been merged in
    loaded: HashSet<PathBuf>,
}

impl CacheIndex {
    /// Creates a new, empty index not shared with anything else
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide index used by caches that were not given their own
    pub fn global() -> CacheIndex {
        static GLOBAL: OnceLock<CacheIndex> = OnceLock::new();
        GLOBAL.get_or_init(CacheIndex::new).clone()
    }

    fn state(&self) -> MutexGuard<'_, IndexState> {
        // A panic while holding the lock cannot leave the map half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.state().entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, entry: CacheEntry) {
        self.state().entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// Copy of all entries, for persisting
    pub fn snapshot(&self) -> HashMap<String, CacheEntry> {
        self.state().entries.clone()
    }

    /// Whether the index file of `directory` still has to be read
    pub fn needs_load(&self, directory: &Path) -> bool {
        !self.state().loaded.contains(directory)
    }

    /// Merges entries read from the index file of `directory`
    ///
    /// Entries already in memory win unless the file has a newer access time.
    pub fn merge_loaded(&self, directory: &Path, entries: HashMap<String, CacheEntry>) {
        let mut state = self.state();
        state.loaded.insert(directory.to_path_buf());

        for (key, entry) in entries {
            let newer = state
                .entries
                .get(&key)
                .map_or(true, |current| entry.access_time > current.access_time);
            if newer {
                state.entries.insert(key, entry);
            }
        }
    }
}
