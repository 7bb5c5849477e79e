//! cache::file_store
//!
//! File-backed blob store.
//!
//! # Layout
//!
//! One directory per store:
//! - `<key>` - One file per entry
//! - `.frozen` - Present while the store is frozen
//! - `.lock` - Lock held during mutations
//!
//! Keys must be valid [`CacheIdentifier`]s, so they can never collide with
//! the dot-prefixed bookkeeping files or escape the directory.
//!
//! # Atomicity
//!
//! All writes go to a uniquely named temp file, are synced, then renamed
//! over the target. Readers see either the old or the new value.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::lock::CacheLock;
use super::traits::{BlobStore, CacheError};
use crate::core::types::CacheIdentifier;

const FROZEN_MARKER: &str = ".frozen";
const LOCK_FILE: &str = ".lock";

/// File-backed [`BlobStore`].
#[derive(Debug)]
pub struct FileBlobStore {
    name: String,
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open a store rooted at `dir`. The directory is created lazily.
    pub fn new(name: impl Into<String>, dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            dir,
        }
    }

    /// Directory holding this store's files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        let id = CacheIdentifier::new(key).map_err(|_| CacheError::InvalidKey(key.to_string()))?;
        Ok(self.dir.join(id.as_str()))
    }

    fn marker_path(&self) -> PathBuf {
        self.dir.join(FROZEN_MARKER)
    }

    fn lock(&self) -> Result<CacheLock, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CacheError::WriteError(format!("cannot create {}: {}", self.dir.display(), e))
        })?;
        Ok(CacheLock::acquire_blocking(&self.dir.join(LOCK_FILE))?)
    }

    fn ensure_writable(&self) -> Result<(), CacheError> {
        if self.marker_path().exists() {
            return Err(CacheError::Frozen(self.name.clone()));
        }
        Ok(())
    }
}

/// Write `contents` to `path` through a synced temp file in the same
/// directory, then rename over the target.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), CacheError> {
    let dir = path
        .parent()
        .ok_or_else(|| CacheError::WriteError(format!("no parent for {}", path.display())))?;
    let temp_path = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));

    let result = write_and_rename(&temp_path, path, contents);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, path: &Path, contents: &str) -> Result<(), CacheError> {
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .map_err(|e| CacheError::WriteError(format!("cannot create temp file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| CacheError::WriteError(format!("cannot write entry: {}", e)))?;

        file.sync_all()
            .map_err(|e| CacheError::WriteError(format!("cannot sync to disk: {}", e)))?;
    }

    fs::rename(temp_path, path)
        .map_err(|e| CacheError::WriteError(format!("cannot rename temp file: {}", e)))
}

impl BlobStore for FileBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::ReadError(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key)?;
        let _lock = self.lock()?;
        self.ensure_writable()?;
        write_atomic(&path, value)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key)?;
        let _lock = self.lock()?;
        self.ensure_writable()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::WriteError(format!(
                "cannot remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn flush(&self) -> Result<(), CacheError> {
        if !self.dir.exists() {
            return Ok(());
        }
        let _lock = self.lock()?;

        let entries = fs::read_dir(&self.dir)
            .map_err(|e| CacheError::WriteError(format!("cannot list {}: {}", self.dir.display(), e)))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::WriteError(e.to_string()))?;
            if entry.file_name() == LOCK_FILE {
                continue;
            }
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| {
                    CacheError::WriteError(format!("cannot remove {}: {}", path.display(), e))
                })?;
            }
        }
        Ok(())
    }

    fn freeze(&self) -> Result<(), CacheError> {
        let _lock = self.lock()?;
        if self.marker_path().exists() {
            return Err(CacheError::AlreadyFrozen(self.name.clone()));
        }
        write_atomic(&self.marker_path(), &chrono::Utc::now().to_rfc3339())
    }

    fn is_frozen(&self) -> Result<bool, CacheError> {
        Ok(self.marker_path().exists())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::ReadError(format!(
                    "cannot list {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::ReadError(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') && entry.path().is_file() {
                keys.push(name);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entry_path(key)?.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, FileBlobStore) {
        let temp = TempDir::new().expect("create temp dir");
        let store = FileBlobStore::new("test", temp.path().join("tier"));
        (temp, store)
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let temp = TempDir::new().expect("create temp dir");
        let target = temp.path().join("occupied");
        fs::create_dir(&target).expect("create dir");
        fs::write(target.join("child"), "x").expect("write child");

        assert!(matches!(
            write_atomic(&target, "{}"),
            Err(CacheError::WriteError(_))
        ));

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let (_temp, store) = create_test_store();
        assert_eq!(store.get("missing").expect("get"), None);
        assert!(store.keys().expect("keys").is_empty());
    }

    #[test]
    fn set_and_get() {
        let (_temp, store) = create_test_store();
        store.set("Acme_Order", "{\"a\":1}").expect("set");

        assert_eq!(
            store.get("Acme_Order").expect("get"),
            Some("{\"a\":1}".to_string())
        );
        assert!(store.has("Acme_Order").expect("has"));
    }

    #[test]
    fn invalid_keys_rejected() {
        let (_temp, store) = create_test_store();
        assert!(matches!(
            store.set("../escape", "x"),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(store.get(".frozen"), Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn keys_skip_bookkeeping_files() {
        let (_temp, store) = create_test_store();
        store.set("b", "").expect("set");
        store.set("a", "").expect("set");
        store.freeze().expect("freeze");

        assert_eq!(store.keys().expect("keys"), vec!["a", "b"]);
    }

    #[test]
    fn remove_nonexistent_ok() {
        let (_temp, store) = create_test_store();
        store.remove("missing").expect("remove");
    }

    #[test]
    fn persistence_across_instances() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = temp.path().join("tier");

        {
            let store = FileBlobStore::new("tier", dir.clone());
            store.set("key", "value").expect("set");
            store.freeze().expect("freeze");
        }

        let store = FileBlobStore::new("tier", dir);
        assert_eq!(store.get("key").expect("get"), Some("value".to_string()));
        assert!(store.is_frozen().expect("is_frozen"));
    }

    mod frozen {
        use super::*;

        #[test]
        fn rejects_writes() {
            let (_temp, store) = create_test_store();
            store.set("a", "1").expect("set");
            store.freeze().expect("freeze");

            assert!(matches!(store.set("a", "2"), Err(CacheError::Frozen(_))));
            assert!(matches!(store.remove("a"), Err(CacheError::Frozen(_))));
            assert_eq!(store.get("a").expect("get"), Some("1".to_string()));
        }

        #[test]
        fn freeze_twice_fails() {
            let (_temp, store) = create_test_store();
            store.freeze().expect("freeze");
            assert!(matches!(
                store.freeze(),
                Err(CacheError::AlreadyFrozen(_))
            ));
        }

        #[test]
        fn flush_thaws_and_empties() {
            let (_temp, store) = create_test_store();
            store.set("a", "1").expect("set");
            store.freeze().expect("freeze");

            store.flush().expect("flush");
            assert!(!store.is_frozen().expect("is_frozen"));
            assert!(store.keys().expect("keys").is_empty());
            store.set("b", "2").expect("set after flush");
        }
    }
}
