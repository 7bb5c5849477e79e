//! reflection::tiers
//!
//! The cache tier manager.
//!
//! # Tiers
//!
//! - `status` - One empty entry per class that was fresh at the last save
//! - `compiletime` - The whole index under `ReflectionData`
//! - `runtime` - Per-class descriptors plus global indices
//! - `schemata` - Per-class schemata
//! - `precompiled` - Per-package bundles for frozen packages
//!
//! # States
//!
//! ```text
//! Cold --load--> LoadedFrozen     (production, runtime tier frozen)
//!      --load--> LoadedPartial    (compile-time snapshot or bundles found)
//!      --load--> ColdRebuilding   (nothing usable)
//! ```
//!
//! In `LoadedFrozen` nothing is ever extracted or written. Class entries
//! start out pending and are loaded from the runtime tiers on demand.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::data::ReflectionData;
use super::descriptor::{ClassDescriptor, ClassEntry};
use super::error::ReflectionError;
use super::schema::ClassSchema;
use crate::cache::{BlobStore, CacheError, FileBlobStore, MemoryBlobStore, PrecompiledStore};
use crate::core::config::ExecutionContext;
use crate::core::paths::CachePaths;
use crate::core::types::{CacheIdentifier, Fingerprint, PackageKey, TypeName};
use crate::introspect::ModuleCatalog;

/// Compile-time tier key of the full snapshot.
pub const REFLECTION_DATA_KEY: &str = "ReflectionData";

/// Runtime tier key of the class name list.
pub const CLASS_NAMES_KEY: &str = "__classNames";

/// Runtime tier key of the class attribute index.
pub const ANNOTATED_CLASSES_KEY: &str = "__annotatedClasses";

/// Runtime tier key of the method attribute index.
pub const METHOD_ANNOTATED_CLASSES_KEY: &str = "__methodAnnotatedClasses";

/// Loading state of the tier manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierState {
    Cold,
    LoadedFrozen,
    LoadedPartial,
    ColdRebuilding,
}

impl std::fmt::Display for TierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cold => "cold",
            Self::LoadedFrozen => "loaded-frozen",
            Self::LoadedPartial => "loaded-partial",
            Self::ColdRebuilding => "cold-rebuilding",
        };
        write!(f, "{s}")
    }
}

/// The set of stores backing the engine.
pub struct CacheTiers {
    pub status: Box<dyn BlobStore>,
    pub compiletime: Option<Box<dyn BlobStore>>,
    pub runtime: Box<dyn BlobStore>,
    pub schemata: Box<dyn BlobStore>,
    pub precompiled: Option<PrecompiledStore>,
}

impl CacheTiers {
    /// Fresh in-memory tiers without precompiled bundles.
    pub fn in_memory() -> Self {
        Self {
            status: Box::new(MemoryBlobStore::named("status")),
            compiletime: Some(Box::new(MemoryBlobStore::named("compiletime"))),
            runtime: Box::new(MemoryBlobStore::named("runtime")),
            schemata: Box::new(MemoryBlobStore::named("schemata")),
            precompiled: None,
        }
    }

    /// File-backed tiers under `paths`.
    pub fn on_disk(paths: &CachePaths) -> Self {
        Self {
            status: Box::new(FileBlobStore::new("status", paths.status_dir())),
            compiletime: Some(Box::new(FileBlobStore::new(
                "compiletime",
                paths.compiletime_dir(),
            ))),
            runtime: Box::new(FileBlobStore::new("runtime", paths.runtime_reflection_dir())),
            schemata: Box::new(FileBlobStore::new("schemata", paths.runtime_schemata_dir())),
            precompiled: Some(PrecompiledStore::new(paths.precompiled_dir())),
        }
    }

    /// Empty and thaw every tier and delete all bundles.
    pub fn flush_all(&self) -> Result<(), CacheError> {
        self.status.flush()?;
        if let Some(compiletime) = &self.compiletime {
            compiletime.flush()?;
        }
        self.runtime.flush()?;
        self.schemata.flush()?;
        if let Some(precompiled) = &self.precompiled {
            precompiled.clear()?;
        }
        Ok(())
    }
}

/// What `save` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Frozen, or nothing changed.
    Skipped,
    Saved(SaveReport),
}

/// Details of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Classes marked fresh in the status tier.
    pub fresh_classes: usize,
    pub snapshot_written: bool,
    pub runtime_frozen: bool,
    pub bundles_written: Vec<PackageKey>,
}

/// Decides what to load at startup and what to persist at shutdown.
pub struct CacheTierManager {
    tiers: CacheTiers,
    context: ExecutionContext,
    state: TierState,
    loaded_fingerprint: Option<Fingerprint>,
}

impl CacheTierManager {
    pub fn new(tiers: CacheTiers, context: ExecutionContext) -> Self {
        Self {
            tiers,
            context,
            state: TierState::Cold,
            loaded_fingerprint: None,
        }
    }

    pub fn state(&self) -> TierState {
        self.state
    }

    pub fn tiers(&self) -> &CacheTiers {
        &self.tiers
    }

    pub fn is_frozen_state(&self) -> bool {
        self.state == TierState::LoadedFrozen
    }

    /// Populate `data` from the tiers and pick the state.
    pub fn load(
        &mut self,
        catalog: &dyn ModuleCatalog,
        data: &mut ReflectionData,
    ) -> Result<TierState, ReflectionError> {
        if self.context.is_production() && self.tiers.runtime.is_frozen()? {
            self.load_frozen_indices(data)?;
            self.state = TierState::LoadedFrozen;
            info!(classes = data.classes.len(), "using frozen runtime reflection cache");
            return Ok(self.state);
        }

        // Bundles go in first so the snapshot's newer links win.
        let mut merged = ReflectionData::new();
        let mut loaded = false;
        if !self.context.is_production() {
            if let Some(precompiled) = &self.tiers.precompiled {
                for package in catalog.frozen_packages()? {
                    match precompiled.read(&package.key) {
                        Ok(Some(bundle)) => {
                            debug!(package = %package.key, "merging precompiled reflection");
                            merged.merge(bundle.data);
                            loaded = true;
                        }
                        Ok(None) => {}
                        Err(e) => warn!(package = %package.key, error = %e, "skipping unreadable precompiled reflection"),
                    }
                }
            }
        }

        if let Some(compiletime) = &self.tiers.compiletime {
            if let Some(blob) = compiletime.get(REFLECTION_DATA_KEY)? {
                merged.merge(decode(REFLECTION_DATA_KEY, &blob)?);
                loaded = true;
            }
        }
        *data = merged;

        self.state = if loaded {
            TierState::LoadedPartial
        } else {
            TierState::ColdRebuilding
        };
        self.loaded_fingerprint = Some(data.fingerprint()?);
        debug!(state = %self.state, classes = data.classes.len(), "reflection cache loaded");
        Ok(self.state)
    }

    fn load_frozen_indices(&self, data: &mut ReflectionData) -> Result<(), ReflectionError> {
        let runtime = &self.tiers.runtime;
        let names: Vec<TypeName> = read_json(runtime.as_ref(), CLASS_NAMES_KEY)?.unwrap_or_default();

        *data = ReflectionData::new();
        data.classes = names.into_iter().map(|n| (n, ClassEntry::Pending)).collect();
        data.annotated_classes = read_json(runtime.as_ref(), ANNOTATED_CLASSES_KEY)?.unwrap_or_default();
        data.classes_by_method_attributes =
            read_json(runtime.as_ref(), METHOD_ANNOTATED_CLASSES_KEY)?.unwrap_or_default();
        Ok(())
    }

    /// Load a pending class from the runtime tiers. Returns whether the
    /// class is now known.
    pub fn load_class(
        &self,
        name: &TypeName,
        data: &mut ReflectionData,
    ) -> Result<bool, ReflectionError> {
        if data.is_known(name) {
            return Ok(true);
        }
        let id = CacheIdentifier::for_type(name);

        let Some(descriptor) = read_json::<ClassDescriptor>(self.tiers.runtime.as_ref(), id.as_str())? else {
            return Ok(false);
        };
        data.classes
            .insert(name.clone(), ClassEntry::Known(Box::new(descriptor)));

        if let Some(schema) = read_json::<ClassSchema>(self.tiers.schemata.as_ref(), id.as_str())? {
            data.schemata.insert(name.clone(), schema);
        }
        Ok(true)
    }

    /// Whether the class had a freshness marker at the last save.
    pub fn is_fresh(&self, name: &TypeName) -> Result<bool, ReflectionError> {
        Ok(self
            .tiers
            .status
            .has(CacheIdentifier::for_type(name).as_str())?)
    }

    /// Drop freshness markers so the next build pass re-extracts.
    pub fn mark_changed(&self, names: &[TypeName]) -> Result<(), ReflectionError> {
        for name in names {
            self.tiers
                .status
                .remove(CacheIdentifier::for_type(name).as_str())?;
        }
        Ok(())
    }

    /// Persist `data` according to the state and execution context.
    pub fn save(
        &mut self,
        data: &ReflectionData,
        updated: &BTreeSet<TypeName>,
        catalog: &dyn ModuleCatalog,
        poisoned: bool,
    ) -> Result<SaveOutcome, ReflectionError> {
        if self.state == TierState::LoadedFrozen || self.state == TierState::Cold {
            return Ok(SaveOutcome::Skipped);
        }
        if poisoned {
            return Err(ReflectionError::IncompleteBuild);
        }
        let compiletime = self
            .tiers
            .compiletime
            .as_ref()
            .ok_or(ReflectionError::MissingCache("compile-time"))?;

        let fingerprint = data.fingerprint()?;
        let changed =
            self.loaded_fingerprint.as_ref() != Some(&fingerprint) || !updated.is_empty();
        let production = self.context.is_production();
        if !changed && !(production && !self.tiers.runtime.is_frozen()?) {
            debug!("reflection data unchanged, skipping save");
            return Ok(SaveOutcome::Skipped);
        }

        let mut report = SaveReport::default();
        if changed {
            for name in updated.iter().filter(|n| data.contains(n)) {
                self.tiers
                    .status
                    .set(CacheIdentifier::for_type(name).as_str(), "")?;
                report.fresh_classes += 1;
            }
            compiletime.set(REFLECTION_DATA_KEY, &data.to_json()?)?;
            report.snapshot_written = true;
        }

        if production {
            self.save_runtime(data)?;
            report.runtime_frozen = true;
        } else {
            report.bundles_written = self.save_missing_bundles(data, catalog)?;
        }

        self.loaded_fingerprint = Some(fingerprint);
        Ok(SaveOutcome::Saved(report))
    }

    fn save_runtime(&self, data: &ReflectionData) -> Result<(), ReflectionError> {
        let runtime = &self.tiers.runtime;
        let schemata = &self.tiers.schemata;
        runtime.flush()?;
        schemata.flush()?;

        let mut names = Vec::with_capacity(data.classes.len());
        for (name, entry) in &data.classes {
            if let Some(descriptor) = entry.descriptor() {
                let id = CacheIdentifier::for_type(name);
                runtime.set(id.as_str(), &serde_json::to_string(descriptor)?)?;
                if let Some(schema) = data.schemata.get(name) {
                    schemata.set(id.as_str(), &serde_json::to_string(schema)?)?;
                }
                names.push(name.clone());
            }
        }

        runtime.set(CLASS_NAMES_KEY, &serde_json::to_string(&names)?)?;
        runtime.set(ANNOTATED_CLASSES_KEY, &serde_json::to_string(&data.annotated_classes)?)?;
        runtime.set(
            METHOD_ANNOTATED_CLASSES_KEY,
            &serde_json::to_string(&data.classes_by_method_attributes)?,
        )?;

        runtime.freeze()?;
        schemata.freeze()?;
        info!(classes = names.len(), "froze runtime reflection cache");
        Ok(())
    }

    fn save_missing_bundles(
        &self,
        data: &ReflectionData,
        catalog: &dyn ModuleCatalog,
    ) -> Result<Vec<PackageKey>, ReflectionError> {
        let Some(precompiled) = &self.tiers.precompiled else {
            return Ok(Vec::new());
        };

        let mut written = Vec::new();
        for package in catalog.frozen_packages()? {
            if precompiled.exists(&package.key) {
                continue;
            }
            precompiled.write(&package.key, data.filter_to(&package.class_names))?;
            info!(package = %package.key, "wrote precompiled reflection");
            written.push(package.key);
        }
        Ok(written)
    }

    /// Write the bundle of one package.
    pub fn freeze_package(
        &self,
        key: &PackageKey,
        classes: &BTreeSet<TypeName>,
        data: &ReflectionData,
    ) -> Result<(), ReflectionError> {
        let precompiled = self
            .tiers
            .precompiled
            .as_ref()
            .ok_or(ReflectionError::MissingCache("precompiled"))?;
        precompiled.write(key, data.filter_to(classes))?;
        Ok(())
    }

    /// Delete the bundle of one package. Returns whether one existed.
    pub fn unfreeze_package(&self, key: &PackageKey) -> Result<bool, ReflectionError> {
        let precompiled = self
            .tiers
            .precompiled
            .as_ref()
            .ok_or(ReflectionError::MissingCache("precompiled"))?;
        Ok(precompiled.remove(key)?)
    }
}

fn decode<T: DeserializeOwned>(key: &str, json: &str) -> Result<T, ReflectionError> {
    serde_json::from_str(json).map_err(|e| {
        CacheError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn read_json<T: DeserializeOwned>(
    store: &dyn BlobStore,
    key: &str,
) -> Result<Option<T>, ReflectionError> {
    match store.get(key)? {
        Some(json) => decode(key, &json).map(Some),
        None => Ok(None),
    }
}
