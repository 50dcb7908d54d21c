//! Optional advisory file locking
//!
//! Cache files are locked opportunistically while they are read or
//! written. Unix and Windows hosts use [`AdvisoryLock`]; other platforms
//! fall back to [`NoLock`], and a lock that cannot be taken never fails
//! the cache operation.

use std::fmt;
use std::fs::File;
use std::sync::Arc;

/// Acquires an exclusive advisory lock on an open file
pub trait FileLocker: Send + Sync {
    /// Locks `file` until the returned guard is dropped
    fn lock_exclusive<'a>(&self, file: &'a File) -> LockGuard<'a>;
}

impl fmt::Debug for dyn FileLocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileLocker")
    }
}

/// Scoped lock; runs its release action on drop
pub struct LockGuard<'a> {
    release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> LockGuard<'a> {
    /// A guard that holds nothing
    pub fn unlocked() -> Self {
        Self { release: None }
    }

    /// A guard that calls `release` when dropped
    pub fn new(release: impl FnOnce() + 'a) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Locker that never locks
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLock;

impl FileLocker for NoLock {
    fn lock_exclusive<'a>(&self, _file: &'a File) -> LockGuard<'a> {
        LockGuard::unlocked()
    }
}

/// Exclusive advisory lock (`flock` on Unix, `LockFileEx` on Windows)
///
/// Blocks until the lock is granted. If the filesystem refuses locking the
/// file is used unlocked.
#[cfg(any(unix, windows))]
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryLock;

#[cfg(any(unix, windows))]
impl FileLocker for AdvisoryLock {
    fn lock_exclusive<'a>(&self, file: &'a File) -> LockGuard<'a> {
        match fs2::FileExt::lock_exclusive(file) {
            Ok(()) => LockGuard::new(move || {
                if let Err(e) = fs2::FileExt::unlock(file) {
                    tracing::debug!("Failed to unlock cache file: {}", e);
                }
            }),
            Err(e) => {
                tracing::debug!("Cache file locking unavailable: {}", e);
                LockGuard::unlocked()
            }
        }
    }
}

/// The locker caches use unless told otherwise
pub fn default_locker() -> Arc<dyn FileLocker> {
    #[cfg(any(unix, windows))]
    {
        Arc::new(AdvisoryLock)
    }
    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(NoLock)
    }
}
