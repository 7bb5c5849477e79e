//! cache::traits
//!
//! Blob storage trait definition.
//!
//! # Design
//!
//! The `BlobStore` trait is a string-keyed store of opaque string values
//! with a one-way read-only mode. Every cache tier (status, compile-time,
//! runtime) is one `BlobStore`.
//!
//! # Frozen Stores
//!
//! - `freeze` makes the store read-only; `set` and `remove` then fail
//! - Freezing an already frozen store fails
//! - `flush` empties the store and thaws it
//!
//! # Example
//!
//! ```
//! use classlens::cache::{BlobStore, CacheError, MemoryBlobStore};
//!
//! let store = MemoryBlobStore::new();
//! store.set("ReflectionData", "{}").unwrap();
//! store.freeze().unwrap();
//!
//! assert!(store.is_frozen().unwrap());
//! assert!(matches!(store.set("x", ""), Err(CacheError::Frozen(_))));
//! ```

use thiserror::Error;

use crate::cache::lock::LockError;

/// Errors from blob storage operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store is frozen and refuses writes.
    #[error("cache '{0}' is frozen")]
    Frozen(String),

    /// `freeze` was called on a frozen store.
    #[error("cache '{0}' is already frozen")]
    AlreadyFrozen(String),

    /// The key cannot be used by this store.
    #[error("invalid cache key '{0}'")]
    InvalidKey(String),

    /// Failed to read from the store.
    #[error("failed to read cache: {0}")]
    ReadError(String),

    /// Failed to write to the store.
    #[error("failed to write cache: {0}")]
    WriteError(String),

    /// A stored entry could not be decoded.
    #[error("corrupt cache entry '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Failed to lock the store.
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Trait for cache tier backends.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait BlobStore: Send + Sync {
    /// Human-readable name used in errors and logs.
    fn name(&self) -> &str;

    /// Get a value by key.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set a value, overwriting any existing one.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry and leave the store unfrozen.
    fn flush(&self) -> Result<(), CacheError>;

    /// Make the store read-only.
    fn freeze(&self) -> Result<(), CacheError>;

    /// Whether the store is read-only.
    fn is_frozen(&self) -> Result<bool, CacheError>;

    /// All keys currently stored, sorted.
    fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Check if a key exists.
    ///
    /// Default implementation uses `get()` and checks for `Some`.
    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }
}
