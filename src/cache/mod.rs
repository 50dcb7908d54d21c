//! File-backed response cache
//!
//! Fetched documents are stored as `<url_hash>.tmp` in the cache directory,
//! with access time and ETag for every URL kept in a shared in-memory index
//! mirrored to `cache_index.tmp`.
//!
//! The cache is an optimization only: every I/O failure is logged and turns
//! into a cache miss or a skipped write, never into an error for the caller.

mod entry;
mod index;
mod lock;

pub use entry::{cache_key, decode_index, encode_index, CacheEntry};
pub use index::CacheIndex;
pub use lock::{default_locker, FileLocker, LockGuard, NoLock};

#[cfg(any(unix, windows))]
pub use lock::AdvisoryLock;

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Name of the index file inside the cache directory
pub const INDEX_FILE: &str = "cache_index.tmp";

/// Extension of cached body files
pub const BODY_EXTENSION: &str = "tmp";

/// Default time-to-live of cached bodies (7 minutes)
pub const DEFAULT_TTL_SECS: u64 = 7 * 60;

#[derive(Debug, Error)]
pub(crate) enum CacheError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Corrupt cache index {path}: {source}")]
    Index {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn is_not_found(&self) -> bool {
        matches!(self, CacheError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Result of a cache lookup
///
/// | body | access_time | meaning |
/// |------|-------------|---------|
/// | None | None | not cached (or caching disabled, or body unreadable) |
/// | None | Some | cached but stale; validators allow revalidation |
/// | Some | Some | fresh hit |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheLookup {
    pub body: Option<String>,
    pub access_time: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

impl CacheLookup {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn is_hit(&self) -> bool {
        self.body.is_some()
    }

    /// Known entry without a usable body
    pub fn is_stale(&self) -> bool {
        self.body.is_none() && self.access_time.is_some()
    }
}

/// Cache of fetched documents keyed by URL
#[derive(Debug, Clone)]
pub struct ResponseCache {
    directory: Option<PathBuf>,
    ttl: Duration,
    index: CacheIndex,
    locker: Arc<dyn FileLocker>,
}

impl ResponseCache {
    /// Creates a cache in `directory` sharing the process-wide index
    ///
    /// # Arguments
    ///
    /// * `directory` - Where bodies and the index live; `None` disables caching
    /// * `ttl` - Age after which a cached body is considered stale
    pub fn new(directory: Option<PathBuf>, ttl: Duration) -> Self {
        Self {
            directory,
            ttl,
            index: CacheIndex::global(),
            locker: default_locker(),
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(None, Duration::seconds(DEFAULT_TTL_SECS as i64))
    }

    /// Uses `index` instead of the process-wide index
    pub fn with_index(mut self, index: CacheIndex) -> Self {
        self.index = index;
        self
    }

    pub fn with_locker(mut self, locker: Arc<dyn FileLocker>) -> Self {
        self.locker = locker;
        self
    }

    /// Moves the cache to `directory`, keeping index, locker and TTL
    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.directory.is_some()
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    /// Looks up `url`, honoring the time-to-live
    pub fn get(&self, url: &str) -> CacheLookup {
        self.get_with(url, false)
    }

    /// Looks up `url`
    ///
    /// With `ignore_access_time` the staleness check is skipped; this is used
    /// to re-read a body after the server answered "not modified".
    pub fn get_with(&self, url: &str, ignore_access_time: bool) -> CacheLookup {
        let Some(directory) = self.directory.as_deref() else {
            tracing::debug!("From inet {}", url);
            return CacheLookup::miss();
        };
        self.ensure_loaded(directory);

        let key = cache_key(url);
        let Some(entry) = self.index.get(&key) else {
            tracing::debug!("From inet {}", url);
            return CacheLookup::miss();
        };

        if !ignore_access_time && entry.is_stale(self.ttl) {
            tracing::debug!("From inet (expired) {}", url);
            return CacheLookup {
                body: None,
                access_time: Some(entry.access_time),
                etag: entry.etag,
            };
        }

        match self.read_body(directory, &key) {
            Ok(body) => {
                tracing::debug!("From cache {}", url);
                CacheLookup {
                    body: Some(body),
                    access_time: Some(entry.access_time),
                    etag: entry.etag,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read cached file: {}", e);
                tracing::debug!("From inet (failure) {}", url);
                CacheLookup::miss()
            }
        }
    }

    /// Stores `body` for `url`
    ///
    /// Does nothing when caching is disabled or `body` is empty. If the body
    /// cannot be written the index is left untouched; if only the index file
    /// cannot be written, the in-memory index still holds the new entry.
    pub fn put(&self, url: &str, body: &str, etag: Option<&str>) {
        let Some(directory) = self.directory.as_deref() else {
            return;
        };
        if body.is_empty() {
            return;
        }
        self.ensure_loaded(directory);

        let key = cache_key(url);
        if let Err(e) = self.write_body(directory, &key, body) {
            tracing::error!("Failed to write cached file: {}", e);
            return;
        }

        self.index
            .insert(key, CacheEntry::new(Utc::now(), etag.map(str::to_string)));
        self.save_index(directory);
    }

    /// Refreshes the index record of `url` without touching its body
    ///
    /// # Arguments
    ///
    /// * `url` - The URL whose record is updated
    /// * `access_time` - New access time; `None` means now
    /// * `etag` - Validator to store with the record
    pub fn update(&self, url: &str, access_time: Option<DateTime<Utc>>, etag: Option<&str>) {
        let Some(directory) = self.directory.as_deref() else {
            return;
        };
        self.ensure_loaded(directory);

        self.index.insert(
            cache_key(url),
            CacheEntry::new(access_time.unwrap_or_else(Utc::now), etag.map(str::to_string)),
        );
        self.save_index(directory);
    }

    fn ensure_loaded(&self, directory: &Path) {
        if !self.index.needs_load(directory) {
            return;
        }

        match self.load_index(directory) {
            Ok(entries) => {
                tracing::debug!("Loaded {} cache index entries from {}", entries.len(), directory.display());
                self.index.merge_loaded(directory, entries);
            }
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!("Failed to load cache file: {}", e);
                }
                self.index.merge_loaded(directory, HashMap::new());
            }
        }
    }

    fn load_index(&self, directory: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
        let path = directory.join(INDEX_FILE);
        let text = self.read_locked(&path)?;
        decode_index(&text).map_err(|source| CacheError::Index { path, source })
    }

    fn save_index(&self, directory: &Path) {
        if let Err(e) = self.write_index(directory) {
            tracing::error!("Failed to save cache: {}", e);
        }
    }

    fn write_index(&self, directory: &Path) -> Result<(), CacheError> {
        let path = directory.join(INDEX_FILE);
        let text = encode_index(&self.index.snapshot()).map_err(|source| CacheError::Index {
            path: path.clone(),
            source,
        })?;
        self.write_locked(&path, &text)
    }

    fn body_path(directory: &Path, key: &str) -> PathBuf {
        directory.join(format!("{}.{}", key, BODY_EXTENSION))
    }

    fn read_body(&self, directory: &Path, key: &str) -> Result<String, CacheError> {
        self.read_locked(&Self::body_path(directory, key))
    }

    fn write_body(&self, directory: &Path, key: &str, body: &str) -> Result<(), CacheError> {
        fs::create_dir_all(directory).map_err(|e| CacheError::io(directory, e))?;
        self.write_locked(&Self::body_path(directory, key), body)
    }

    fn read_locked(&self, path: &Path) -> Result<String, CacheError> {
        let file = File::open(path).map_err(|e| CacheError::io(path, e))?;
        let _guard = self.locker.lock_exclusive(&file);

        let mut text = String::new();
        let mut reader = &file;
        reader
            .read_to_string(&mut text)
            .map_err(|e| CacheError::io(path, e))?;
        Ok(text)
    }

    fn write_locked(&self, path: &Path, text: &str) -> Result<(), CacheError> {
        // Truncated under the lock
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| CacheError::io(path, e))?;
        let _guard = self.locker.lock_exclusive(&file);

        let mut writer = &file;
        file.set_len(0)
            .and_then(|_| writer.write_all(text.as_bytes()))
            .and_then(|_| writer.flush())
            .map_err(|e| CacheError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> ResponseCache {
        ResponseCache::new(Some(dir.path().to_path_buf()), Duration::minutes(7)).with_index(CacheIndex::new())
    }

    #[test]
    fn test_disabled_cache_misses() {
        let cache = ResponseCache::disabled().with_index(CacheIndex::new());
        cache.put("https://example.com/", "<html></html>", None);
        assert_eq!(cache.get("https://example.com/"), CacheLookup::miss());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn test_never_cached_misses() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        assert_eq!(cache.get("https://example.com/never"), CacheLookup::miss());
    }

    #[test]
    fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.put("https://example.com/", "<p>body</p>", Some("\"e1\""));

        let lookup = cache.get("https://example.com/");
        assert_eq!(lookup.body.as_deref(), Some("<p>body</p>"));
        assert_eq!(lookup.etag.as_deref(), Some("\"e1\""));
        let age = Utc::now() - lookup.access_time.unwrap();
        assert!(age < Duration::seconds(5));

        let key = cache_key("https://example.com/");
        assert!(dir.path().join(format!("{}.tmp", key)).exists());
        assert!(dir.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn test_empty_body_not_stored() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.put("https://example.com/", "", Some("e"));
        assert_eq!(cache.get("https://example.com/"), CacheLookup::miss());
        assert!(cache.index().is_empty());
    }

    #[test]
    fn test_stale_entry_returns_validators() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let url = "https://example.com/old";
        cache.put(url, "old body", Some("tag"));

        let old = Utc::now() - Duration::minutes(10);
        cache.update(url, Some(old), Some("tag"));

        let lookup = cache.get(url);
        assert!(lookup.is_stale());
        assert_eq!(lookup.access_time, Some(old));
        assert_eq!(lookup.etag.as_deref(), Some("tag"));

        let ignored = cache.get_with(url, true);
        assert_eq!(ignored.body.as_deref(), Some("old body"));
    }

    #[test]
    fn test_missing_body_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let url = "https://example.com/gone";
        cache.put(url, "body", None);

        fs::remove_file(dir.path().join(format!("{}.tmp", cache_key(url)))).unwrap();
        assert_eq!(cache.get(url), CacheLookup::miss());
    }

    #[test]
    fn test_index_reloaded_by_new_process() {
        let dir = TempDir::new().unwrap();
        let url = "https://example.com/persisted";
        cache_in(&dir).put(url, "persisted body", Some("p1"));

        // a fresh index stands in for a new process
        let reopened = cache_in(&dir);
        let lookup = reopened.get(url);
        assert_eq!(lookup.body.as_deref(), Some("persisted body"));
        assert_eq!(lookup.etag.as_deref(), Some("p1"));
    }

    #[test]
    fn test_corrupt_index_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "{{{ not json").unwrap();

        let cache = cache_in(&dir);
        assert_eq!(cache.get("https://example.com/"), CacheLookup::miss());

        cache.put("https://example.com/", "fresh", None);
        assert_eq!(cache.get("https://example.com/").body.as_deref(), Some("fresh"));
    }

    #[test]
    fn test_shared_index_between_caches() {
        let dir = TempDir::new().unwrap();
        let index = CacheIndex::new();
        let a = ResponseCache::new(Some(dir.path().to_path_buf()), Duration::minutes(7)).with_index(index.clone());
        let b = ResponseCache::new(Some(dir.path().to_path_buf()), Duration::minutes(7)).with_index(index);

        a.put("https://example.com/shared", "shared", None);
        assert_eq!(b.get("https://example.com/shared").body.as_deref(), Some("shared"));
    }

    #[test]
    fn test_unwritable_directory_skips_put() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let cache = ResponseCache::new(Some(blocker.join("cache")), Duration::minutes(7)).with_index(CacheIndex::new());
        cache.put("https://example.com/", "body", None);
        assert!(cache.index().is_empty());
        assert_eq!(cache.get("https://example.com/"), CacheLookup::miss());
    }

    #[derive(Default)]
    struct CountingLock {
        count: AtomicUsize,
    }

    impl FileLocker for CountingLock {
        fn lock_exclusive<'a>(&self, _file: &'a File) -> LockGuard<'a> {
            self.count.fetch_add(1, Ordering::SeqCst);
            LockGuard::unlocked()
        }
    }

    #[test]
    fn test_locker_used_for_file_access() {
        let dir = TempDir::new().unwrap();
        let locker = Arc::new(CountingLock::default());
        let cache = cache_in(&dir).with_locker(locker.clone());

        cache.put("https://example.com/", "body", None);
        // body + index
        assert_eq!(locker.count.load(Ordering::SeqCst), 2);

        cache.get("https://example.com/");
        assert_eq!(locker.count.load(Ordering::SeqCst), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_default_cache_waits_for_file_lock() {
        let dir = TempDir::new().unwrap();
        let url = "https://example.com/locked";
        let body_path = dir.path().join(format!("{}.{}", cache_key(url), BODY_EXTENSION));
        fs::write(&body_path, "stale").unwrap();

        let holder = File::open(&body_path).unwrap();
        fs2::FileExt::lock_exclusive(&holder).unwrap();

        let cache = cache_in(&dir);
        let writer = {
            let cache = cache.clone();
            std::thread::spawn(move || cache.put(url, "fresh", None))
        };

        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(!writer.is_finished(), "put must wait for the body lock");

        fs2::FileExt::unlock(&holder).unwrap();
        writer.join().unwrap();
        assert_eq!(cache.get(url).body.as_deref(), Some("fresh"));
    }

    #[test]
    fn test_with_directory_and_ttl() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::disabled()
            .with_index(CacheIndex::new())
            .with_directory(Some(dir.path().to_path_buf()))
            .with_ttl(Duration::seconds(5));

        assert!(cache.is_enabled());
        assert_eq!(cache.ttl(), Duration::seconds(5));
        cache.put("https://example.com/", "body", None);
        assert!(cache.get("https://example.com/").is_hit());
    }
}
