//! cache::memory
//!
//! In-memory blob store.
//!
//! Clones share state, so a test can hand one clone to a service, drop the
//! service, and hand another clone to a fresh service to simulate a
//! process restart.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{BlobStore, CacheError};

/// In-memory [`BlobStore`].
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    name: String,
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    frozen: bool,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create an empty store with a name used in errors.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(MemoryInner::default())),
        }
    }

    fn inner(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner().entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner().entries.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut inner = self.inner();
        if inner.frozen {
            return Err(CacheError::Frozen(self.name.clone()));
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut inner = self.inner();
        if inner.frozen {
            return Err(CacheError::Frozen(self.name.clone()));
        }
        inner.entries.remove(key);
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut inner = self.inner();
        inner.entries.clear();
        inner.frozen = false;
        Ok(())
    }

    fn freeze(&self) -> Result<(), CacheError> {
        let mut inner = self.inner();
        if inner.frozen {
            return Err(CacheError::AlreadyFrozen(self.name.clone()));
        }
        inner.frozen = true;
        Ok(())
    }

    fn is_frozen(&self) -> Result<bool, CacheError> {
        Ok(self.inner().frozen)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.inner().entries.keys().cloned().collect())
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.inner().entries.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
        assert!(!store.has("missing").unwrap());
    }

    #[test]
    fn set_get_remove() {
        let store = MemoryBlobStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));

        store.remove("a").unwrap();
        assert!(store.is_empty());
        store.remove("a").unwrap();
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryBlobStore::new();
        let other = store.clone();

        store.set("key", "value").unwrap();
        assert_eq!(other.get("key").unwrap(), Some("value".to_string()));

        other.freeze().unwrap();
        assert!(store.is_frozen().unwrap());
    }

    mod frozen {
        use super::*;

        #[test]
        fn rejects_writes() {
            let store = MemoryBlobStore::named("runtime");
            store.set("a", "1").unwrap();
            store.freeze().unwrap();

            assert!(matches!(store.set("b", "2"), Err(CacheError::Frozen(n)) if n == "runtime"));
            assert!(matches!(store.remove("a"), Err(CacheError::Frozen(_))));
            assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        }

        #[test]
        fn freeze_twice_fails() {
            let store = MemoryBlobStore::new();
            store.freeze().unwrap();
            assert!(matches!(store.freeze(), Err(CacheError::AlreadyFrozen(_))));
        }

        #[test]
        fn flush_thaws() {
            let store = MemoryBlobStore::new();
            store.set("a", "1").unwrap();
            store.freeze().unwrap();

            store.flush().unwrap();
            assert!(!store.is_frozen().unwrap());
            assert!(store.is_empty());
            store.set("b", "2").unwrap();
        }
    }

    #[test]
    fn keys_sorted() {
        let store = MemoryBlobStore::new();
        store.set("b", "").unwrap();
        store.set("a", "").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }
}
