//! core::paths
//!
//! Centralized path routing for on-disk cache tiers.
//!
//! **Hard rule:** No code outside this module should compute paths below
//! the cache root. All locations go through [`CachePaths`].
//!
//! # Storage Layout
//!
//! All cache data is stored under one root directory:
//! - `status/` - Per-class freshness markers
//! - `compiletime/` - Full reflection snapshot
//! - `runtime/reflection/` - Per-class descriptors and global indices
//! - `runtime/schemata/` - Per-class schemata
//! - `precompiled/<package>.json` - Frozen package bundles
//! - `lock` - Exclusive lock file
//!
//! # Example
//!
//! ```
//! use classlens::core::paths::CachePaths;
//! use classlens::core::types::PackageKey;
//! use std::path::PathBuf;
//!
//! let paths = CachePaths::new(PathBuf::from("/var/cache/lens"));
//! let key = PackageKey::new("Acme.Shop").unwrap();
//!
//! assert_eq!(
//!     paths.precompiled_path(&key),
//!     PathBuf::from("/var/cache/lens/precompiled/Acme.Shop.json")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::PackageKey;

/// File extension of precompiled bundles.
pub const PRECOMPILED_EXTENSION: &str = "json";

/// Centralized path routing for cache storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    root: PathBuf,
}

impl CachePaths {
    /// Create paths rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Default root when none is configured.
    ///
    /// Uses the platform cache directory, falling back to
    /// `.classlens/cache` under `project_root`.
    pub fn default_root(project_root: &Path) -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join("classlens"))
            .unwrap_or_else(|| project_root.join(".classlens/cache"))
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the status tier.
    pub fn status_dir(&self) -> PathBuf {
        self.root.join("status")
    }

    /// Directory of the compile-time tier.
    pub fn compiletime_dir(&self) -> PathBuf {
        self.root.join("compiletime")
    }

    /// Directory of the runtime reflection tier.
    pub fn runtime_reflection_dir(&self) -> PathBuf {
        self.root.join("runtime").join("reflection")
    }

    /// Directory of the runtime schemata tier.
    pub fn runtime_schemata_dir(&self) -> PathBuf {
        self.root.join("runtime").join("schemata")
    }

    /// Directory holding precompiled package bundles.
    pub fn precompiled_dir(&self) -> PathBuf {
        self.root.join("precompiled")
    }

    /// Bundle path for one package.
    pub fn precompiled_path(&self, package: &PackageKey) -> PathBuf {
        self.precompiled_dir()
            .join(format!("{}.{}", package.as_str(), PRECOMPILED_EXTENSION))
    }

    /// Path to the cache lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join("lock")
    }
}
