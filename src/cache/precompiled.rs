//! cache::precompiled
//!
//! Per-package precompiled reflection bundles.
//!
//! # Format
//!
//! One JSON file per frozen package, named `<package-key>.json`:
//!
//! ```json
//! {
//!   "kind": "classlens.precompiled-reflection",
//!   "schema_version": 1,
//!   "package": "Acme.Shop",
//!   "frozen_at": "2024-01-01T00:00:00Z",
//!   "data": { "classes": {}, "schemata": {} }
//! }
//! ```
//!
//! `data` holds only the package's own classes. Bundles are parsed with
//! version dispatch; an unknown `kind` or `schema_version` is rejected.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::file_store::write_atomic;
use super::traits::CacheError;
use crate::core::paths::PRECOMPILED_EXTENSION;
use crate::core::types::{PackageKey, UtcTimestamp};
use crate::reflection::data::ReflectionData;

/// The kind identifier of precompiled bundles.
pub const PRECOMPILED_KIND: &str = "classlens.precompiled-reflection";

/// Current bundle schema version.
pub const PRECOMPILED_SCHEMA_VERSION: u32 = 1;

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct BundleEnvelope {
    kind: String,
    schema_version: u32,
}

/// A precompiled package bundle (v1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrecompiledBundle {
    pub kind: String,
    pub schema_version: u32,
    pub package: PackageKey,
    pub frozen_at: UtcTimestamp,
    pub data: ReflectionData,
}

impl PrecompiledBundle {
    /// Bundle `data` for `package`, stamped now.
    pub fn new(package: PackageKey, data: ReflectionData) -> Self {
        Self {
            kind: PRECOMPILED_KIND.to_string(),
            schema_version: PRECOMPILED_SCHEMA_VERSION,
            package,
            frozen_at: UtcTimestamp::now(),
            data,
        }
    }
}

/// Parse a bundle with version dispatch.
pub fn parse_bundle(key: &str, json: &str) -> Result<PrecompiledBundle, CacheError> {
    let corrupt = |message: String| CacheError::Corrupt {
        key: key.to_string(),
        message,
    };

    let envelope: BundleEnvelope =
        serde_json::from_str(json).map_err(|e| corrupt(e.to_string()))?;
    if envelope.kind != PRECOMPILED_KIND {
        return Err(corrupt(format!(
            "invalid kind '{}', expected '{}'",
            envelope.kind, PRECOMPILED_KIND
        )));
    }

    match envelope.schema_version {
        1 => serde_json::from_str(json).map_err(|e| corrupt(e.to_string())),
        v => Err(corrupt(format!(
            "unsupported schema version {v}, supported: {PRECOMPILED_SCHEMA_VERSION}"
        ))),
    }
}

/// Directory of precompiled bundles.
#[derive(Debug, Clone)]
pub struct PrecompiledStore {
    dir: PathBuf,
}

impl PrecompiledStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, package: &PackageKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", package.as_str(), PRECOMPILED_EXTENSION))
    }

    pub fn exists(&self, package: &PackageKey) -> bool {
        self.path(package).is_file()
    }

    /// Read a package bundle, `None` if absent.
    pub fn read(&self, package: &PackageKey) -> Result<Option<PrecompiledBundle>, CacheError> {
        let path = self.path(package);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::ReadError(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let bundle = parse_bundle(package.as_str(), &json)?;
        if &bundle.package != package {
            return Err(CacheError::Corrupt {
                key: package.to_string(),
                message: format!("bundle belongs to package '{}'", bundle.package),
            });
        }
        Ok(Some(bundle))
    }

    /// Write (or replace) a package bundle.
    pub fn write(&self, package: &PackageKey, data: ReflectionData) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CacheError::WriteError(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let bundle = PrecompiledBundle::new(package.clone(), data);
        let json = serde_json::to_string(&bundle).map_err(|e| CacheError::WriteError(e.to_string()))?;
        write_atomic(&self.path(package), &json)
    }

    /// Delete a package bundle. Returns whether one existed.
    pub fn remove(&self, package: &PackageKey) -> Result<bool, CacheError> {
        let path = self.path(package);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::WriteError(format!(
                "cannot remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Package keys with a bundle on disk, sorted.
    pub fn keys(&self) -> Result<Vec<PackageKey>, CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::ReadError(e.to_string())),
        };

        let suffix = format!(".{PRECOMPILED_EXTENSION}");
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::ReadError(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(key) = name.strip_suffix(&suffix) {
                if let Ok(key) = PackageKey::new(key) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Delete every bundle.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let keys = self.keys()?;
        for key in &keys {
            self.remove(key)?;
        }
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TypeName;
    use crate::reflection::descriptor::{ClassDescriptor, ClassEntry};
    use tempfile::TempDir;

    fn key(s: &str) -> PackageKey {
        PackageKey::new(s).unwrap()
    }

    fn sample_data() -> ReflectionData {
        let mut data = ReflectionData::new();
        data.classes.insert(
            TypeName::new("Acme::Order").unwrap(),
            ClassEntry::Known(Box::new(ClassDescriptor::default())),
        );
        data
    }

    fn create_test_store() -> (TempDir, PrecompiledStore) {
        let temp = TempDir::new().expect("create temp dir");
        let store = PrecompiledStore::new(temp.path().join("precompiled"));
        (temp, store)
    }

    #[test]
    fn write_read_remove() {
        let (_temp, store) = create_test_store();
        let pkg = key("Acme.Shop");
        assert!(store.read(&pkg).expect("read").is_none());

        store.write(&pkg, sample_data()).expect("write");
        assert!(store.exists(&pkg));

        let bundle = store.read(&pkg).expect("read").expect("bundle");
        assert_eq!(bundle.kind, PRECOMPILED_KIND);
        assert_eq!(bundle.data, sample_data());

        assert!(store.remove(&pkg).expect("remove"));
        assert!(!store.remove(&pkg).expect("remove again"));
    }

    #[test]
    fn keys_and_clear() {
        let (_temp, store) = create_test_store();
        store.write(&key("B"), ReflectionData::new()).expect("write");
        store.write(&key("A"), ReflectionData::new()).expect("write");

        assert_eq!(store.keys().expect("keys"), vec![key("A"), key("B")]);
        assert_eq!(store.clear().expect("clear"), 2);
        assert!(store.keys().expect("keys").is_empty());
    }

    mod parsing {
        use super::*;

        #[test]
        fn rejects_unknown_kind() {
            let json = r#"{"kind":"other","schema_version":1}"#;
            assert!(matches!(
                parse_bundle("x", json),
                Err(CacheError::Corrupt { .. })
            ));
        }

        #[test]
        fn rejects_future_version() {
            let json = r#"{"kind":"classlens.precompiled-reflection","schema_version":2}"#;
            let err = parse_bundle("x", json).unwrap_err();
            assert!(err.to_string().contains("unsupported schema version 2"));
        }

        #[test]
        fn rejects_garbage() {
            assert!(parse_bundle("x", "not json").is_err());
        }
    }

    #[test]
    fn foreign_bundle_rejected() {
        let (_temp, store) = create_test_store();
        store.write(&key("A"), ReflectionData::new()).expect("write");
        fs::rename(store.path(&key("A")), store.path(&key("B"))).expect("rename");

        assert!(matches!(
            store.read(&key("B")),
            Err(CacheError::Corrupt { .. })
        ));
    }
}
