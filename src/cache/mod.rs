//! cache
//!
//! Storage backends for the reflection cache tiers.
//!
//! # Modules
//!
//! - [`traits`] - The `BlobStore` contract and `CacheError`
//! - [`memory`] - In-memory store for tests and ephemeral runs
//! - [`file_store`] - One-file-per-key store with a frozen marker
//! - [`lock`] - Cross-process exclusive lock
//! - [`precompiled`] - Per-package precompiled bundles

pub mod file_store;
pub mod lock;
pub mod memory;
pub mod precompiled;
pub mod traits;

pub use file_store::FileBlobStore;
pub use lock::{CacheLock, LockError};
pub use memory::MemoryBlobStore;
pub use precompiled::{PrecompiledBundle, PrecompiledStore};
pub use traits::{BlobStore, CacheError};
