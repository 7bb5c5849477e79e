//! cache::lock
//!
//! Exclusive cross-process lock over a cache directory.
//!
//! # Invariants
//!
//! - Lock is automatically released on drop (RAII pattern)
//! - [`CacheLock::acquire`] is non-blocking (fails fast if locked)
//! - [`CacheLock::acquire_blocking`] waits for the current holder
//!
//! # Example
//!
//! ```no_run
//! use classlens::cache::lock::CacheLock;
//! use std::path::Path;
//!
//! let lock = CacheLock::acquire(Path::new("/var/cache/lens/lock")).unwrap();
//! // Mutate the cache while holding the lock
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("cache is locked by another process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on a cache location.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl CacheLock {
    /// Attempt to acquire the lock at `path` without waiting.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another holder has the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let file = Self::open(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: path.to_path_buf(),
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Acquire the lock at `path`, waiting for any current holder.
    pub fn acquire_blocking(path: &Path) -> Result<Self, LockError> {
        let file = Self::open(path)?;
        file.lock_exclusive()
            .map_err(|e| LockError::AcquireFailed(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// Try to acquire the lock, returning None if already held.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LockError> {
        match Self::acquire(path) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyLocked) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn open(path: &Path) -> Result<File, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e)))
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_parent_directories() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("nested").join("lock");

        let lock = CacheLock::acquire(&path).expect("acquire lock");
        assert!(lock.is_held());
        assert!(path.exists());
        assert_eq!(lock.path(), path);
    }

    #[test]
    fn second_acquire_fails() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("lock");

        let _lock = CacheLock::acquire(&path).expect("first acquire");
        assert!(matches!(
            CacheLock::acquire(&path),
            Err(LockError::AlreadyLocked)
        ));
        assert!(CacheLock::try_acquire(&path).expect("try").is_none());
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("lock");

        {
            let _lock = CacheLock::acquire(&path).expect("first acquire");
        }

        let lock = CacheLock::acquire_blocking(&path).expect("reacquire");
        assert!(lock.is_held());
    }

    #[test]
    fn explicit_release_is_repeatable() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("lock");

        let mut lock = CacheLock::acquire(&path).expect("acquire");
        lock.release().expect("first release");
        lock.release().expect("second release");
        assert!(!lock.is_held());

        assert!(CacheLock::try_acquire(&path).expect("try").is_some());
    }
}
