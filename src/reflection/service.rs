//! reflection::service
//!
//! The reflection facade.
//!
//! # Lifecycle
//!
//! ```text
//! build() -> [initialize: load tiers] -> build pass / queries -> save_to_cache()
//! ```
//!
//! The service is an explicit context object: the process bootstrap builds
//! one, hands it to whatever needs reflection, and calls
//! [`ReflectionService::save_to_cache`] once at shutdown.
//!
//! # Queries
//!
//! Queries take class names as strings. A name that is not a valid type
//! name, or names a class that does not exist, yields an empty answer.
//! Queries that require an interface or a class fail with
//! [`ReflectionError::NotAnInterface`] or [`ReflectionError::NotAClass`]
//! when the name is something else.
//!
//! Unknown classes are extracted lazily on first query, except in the
//! frozen state where they are loaded from the runtime tiers or missed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use classlens::core::types::{PackageKey, TypeName};
//! use classlens::introspect::{PackageDef, StaticCatalog, TypeDef};
//! use classlens::reflection::ReflectionService;
//!
//! let catalog = StaticCatalog::new(vec![PackageDef::new(PackageKey::new("Acme").unwrap())
//!     .with_type(TypeDef::class(TypeName::new("Acme::Order").unwrap()).final_())])
//! .unwrap();
//!
//! let mut service = ReflectionService::from_catalog(Arc::new(catalog)).build();
//! service.build_from_catalog().unwrap();
//! assert!(service.is_class_final("Acme::Order").unwrap());
//! assert!(!service.is_class_final("Acme::Missing").unwrap());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use super::attributes::{Attribute, AttributeKind};
use super::data::ReflectionData;
use super::descriptor::{ClassDescriptor, MethodDescriptor, ParameterDescriptor, PropertyDescriptor};
use super::error::ReflectionError;
use super::expander::TypeExpander;
use super::extractor::Extractor;
use super::schema::ClassSchema;
use super::schema_builder::SchemaBuilder;
use super::tiers::{CacheTierManager, CacheTiers, SaveOutcome, TierState};
use crate::core::config::ReflectionSettings;
use crate::core::types::{PackageKey, TypeName, Visibility};
use crate::introspect::{AttributeReader, ModuleCatalog, StaticCatalog, TypeIntrospector, TypeKind};

/// Result of a build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Classes dropped because they changed or disappeared.
    pub forgotten: Vec<TypeName>,
    /// Classes extracted during the pass.
    pub reflected: Vec<TypeName>,
    /// Schemata built for the reflected classes.
    pub schemata: usize,
}

/// Builder for [`ReflectionService`].
pub struct ReflectionServiceBuilder {
    introspector: Arc<dyn TypeIntrospector>,
    catalog: Arc<dyn ModuleCatalog>,
    attributes: Arc<dyn AttributeReader>,
    settings: ReflectionSettings,
    tiers: Option<CacheTiers>,
}

impl ReflectionServiceBuilder {
    pub fn new(
        introspector: Arc<dyn TypeIntrospector>,
        catalog: Arc<dyn ModuleCatalog>,
        attributes: Arc<dyn AttributeReader>,
    ) -> Self {
        Self {
            introspector,
            catalog,
            attributes,
            settings: ReflectionSettings::default(),
            tiers: None,
        }
    }

    pub fn settings(mut self, settings: ReflectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Cache tiers to use. Defaults to fresh in-memory tiers.
    pub fn tiers(mut self, tiers: CacheTiers) -> Self {
        self.tiers = Some(tiers);
        self
    }

    pub fn build(self) -> ReflectionService {
        let tiers = self.tiers.unwrap_or_else(CacheTiers::in_memory);
        ReflectionService {
            introspector: self.introspector,
            catalog: self.catalog,
            attributes: self.attributes,
            tiers: CacheTierManager::new(tiers, self.settings.context),
            settings: self.settings,
            data: ReflectionData::new(),
            expander: TypeExpander::new(),
            updated: BTreeSet::new(),
            initialized: false,
            poisoned: false,
        }
    }
}

/// Reflection engine and query facade.
pub struct ReflectionService {
    introspector: Arc<dyn TypeIntrospector>,
    catalog: Arc<dyn ModuleCatalog>,
    attributes: Arc<dyn AttributeReader>,
    settings: ReflectionSettings,
    tiers: CacheTierManager,
    data: ReflectionData,
    expander: TypeExpander,
    /// Classes extracted since the last save.
    updated: BTreeSet<TypeName>,
    initialized: bool,
    /// Set once an extraction or schema build failed.
    poisoned: bool,
}

impl ReflectionService {
    pub fn builder(
        introspector: Arc<dyn TypeIntrospector>,
        catalog: Arc<dyn ModuleCatalog>,
        attributes: Arc<dyn AttributeReader>,
    ) -> ReflectionServiceBuilder {
        ReflectionServiceBuilder::new(introspector, catalog, attributes)
    }

    /// Builder using one static catalog for all three collaborators.
    pub fn from_catalog(catalog: Arc<StaticCatalog>) -> ReflectionServiceBuilder {
        ReflectionServiceBuilder::new(catalog.clone(), catalog.clone(), catalog)
    }

    pub fn settings(&self) -> &ReflectionSettings {
        &self.settings
    }

    pub fn data(&self) -> &ReflectionData {
        &self.data
    }

    pub fn state(&self) -> TierState {
        self.tiers.state()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Load the cache tiers. Runs once; later calls return the state.
    pub fn initialize(&mut self) -> Result<TierState, ReflectionError> {
        if !self.initialized {
            self.tiers.load(self.catalog.as_ref(), &mut self.data)?;
            self.initialized = true;
        }
        Ok(self.tiers.state())
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    /// Forget changed classes, extract emerged ones and build their
    /// schemata.
    ///
    /// A class is changed when its freshness marker is missing from the
    /// status tier. Classes of frozen packages are never considered
    /// changed. Emerged classes are those in `available` not tracked yet.
    pub fn build_reflection_data(
        &mut self,
        available: &BTreeSet<TypeName>,
    ) -> Result<BuildReport, ReflectionError> {
        self.initialize()?;
        let mut report = BuildReport::default();
        if self.tiers.is_frozen_state() {
            return Ok(report);
        }

        let frozen = self.frozen_package_classes()?;
        let tracked: Vec<TypeName> = self
            .data
            .classes
            .keys()
            .filter(|name| !frozen.contains(*name) && !self.updated.contains(*name))
            .cloned()
            .collect();
        for name in tracked {
            if self.data.contains(&name) && !self.tiers.is_fresh(&name)? {
                report.forgotten.extend(self.data.forget(&name));
            }
        }

        let before = self.updated.clone();
        let emerged: Vec<TypeName> = available
            .iter()
            .filter(|name| !self.data.contains(name))
            .cloned()
            .collect();
        for name in &emerged {
            self.run_extractor(name)?;
        }
        if !emerged.is_empty() {
            info!(count = emerged.len(), "reflected emerged classes");
        }

        let batch: BTreeSet<TypeName> = self.updated.difference(&before).cloned().collect();
        let built = SchemaBuilder::new(&mut self.data, &self.settings).build_schemata(&batch);
        report.schemata = match built {
            Ok(count) => count,
            Err(e) => {
                self.poisoned = true;
                return Err(e);
            }
        };
        report.reflected = batch.into_iter().collect();
        Ok(report)
    }

    /// Build pass over every class the catalog declares. Tracked classes
    /// the catalog no longer declares are forgotten first.
    pub fn build_from_catalog(&mut self) -> Result<BuildReport, ReflectionError> {
        self.initialize()?;
        let available = self.catalog.available_class_names()?;

        let mut removed = Vec::new();
        if !self.tiers.is_frozen_state() {
            let frozen = self.frozen_package_classes()?;
            let stale: Vec<TypeName> = self
                .data
                .classes
                .keys()
                .filter(|name| !available.contains(*name) && !frozen.contains(*name))
                .cloned()
                .collect();
            for name in stale {
                removed.extend(self.data.forget(&name));
            }
        }

        let mut report = self.build_reflection_data(&available)?;
        removed.append(&mut report.forgotten);
        report.forgotten = removed;
        Ok(report)
    }

    /// Extract a class unless known. Fails if it does not exist.
    pub fn extract(&mut self, name: &TypeName) -> Result<&ClassDescriptor, ReflectionError> {
        if !self.load_or_reflect(name)? {
            return Err(ReflectionError::ClassLoadingFailed(name.clone()));
        }
        self.data
            .descriptor(name)
            .ok_or_else(|| ReflectionError::ClassLoadingFailed(name.clone()))
    }

    /// Forget a class and its subclasses. No-op in the frozen state.
    pub fn forget_class(&mut self, name: &TypeName) -> Result<Vec<TypeName>, ReflectionError> {
        self.initialize()?;
        if self.tiers.is_frozen_state() {
            return Ok(Vec::new());
        }
        let forgotten = self.data.forget(name);
        for class in &forgotten {
            self.updated.remove(class);
        }
        Ok(forgotten)
    }

    /// Drop freshness markers so the next build pass re-extracts the
    /// classes.
    pub fn mark_classes_changed(&self, names: &[TypeName]) -> Result<(), ReflectionError> {
        self.tiers.mark_changed(names)
    }

    /// Persist the in-memory state. Call once at shutdown.
    pub fn save_to_cache(&mut self) -> Result<SaveOutcome, ReflectionError> {
        if !self.initialized {
            return Ok(SaveOutcome::Skipped);
        }
        let outcome = self.tiers.save(
            &self.data,
            &self.updated,
            self.catalog.as_ref(),
            self.poisoned,
        )?;
        if let SaveOutcome::Saved(report) = &outcome {
            debug!(fresh = report.fresh_classes, "saved reflection cache");
            self.updated.clear();
        }
        Ok(outcome)
    }

    /// Write the precompiled bundle of a package. Returns the number of
    /// classes bundled.
    pub fn freeze_package_reflection(&mut self, key: &PackageKey) -> Result<usize, ReflectionError> {
        self.initialize()?;
        let package = self
            .catalog
            .package(key)?
            .ok_or_else(|| ReflectionError::UnknownPackage(key.clone()))?;

        if self.tiers.is_frozen_state() {
            for name in &package.class_names {
                self.load_or_reflect(name)?;
            }
        } else {
            self.build_reflection_data(&package.class_names)?;
        }

        self.tiers
            .freeze_package(key, &package.class_names, &self.data)?;
        info!(package = %key, classes = package.class_names.len(), "froze package reflection");
        Ok(package.class_names.len())
    }

    /// Delete the precompiled bundle of a package and mark its classes
    /// changed. Returns whether a bundle existed.
    pub fn unfreeze_package_reflection(&mut self, key: &PackageKey) -> Result<bool, ReflectionError> {
        let package = self
            .catalog
            .package(key)?
            .ok_or_else(|| ReflectionError::UnknownPackage(key.clone()))?;

        let removed = self.tiers.unfreeze_package(key)?;
        let names: Vec<TypeName> = package.class_names.into_iter().collect();
        self.tiers.mark_changed(&names)?;
        info!(package = %key, removed, "unfroze package reflection");
        Ok(removed)
    }

    fn frozen_package_classes(&self) -> Result<BTreeSet<TypeName>, ReflectionError> {
        Ok(self
            .catalog
            .frozen_packages()?
            .into_iter()
            .flat_map(|p| p.class_names)
            .collect())
    }

    fn run_extractor(&mut self, name: &TypeName) -> Result<(), ReflectionError> {
        let result = Extractor::new(
            &mut self.data,
            &mut self.expander,
            self.introspector.as_ref(),
            self.attributes.as_ref(),
            &self.settings,
            &mut self.updated,
        )
        .extract(name);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Make sure `name` is known. Returns false for a miss.
    fn load_or_reflect(&mut self, name: &TypeName) -> Result<bool, ReflectionError> {
        self.initialize()?;
        if self.data.is_known(name) {
            return Ok(true);
        }
        if self.tiers.is_frozen_state() {
            return self.tiers.load_class(name, &mut self.data);
        }
        // Proxies go through the extractor so the refusal surfaces.
        if !self.settings.is_proxy_name(name.as_str())
            && !self
                .expander
                .type_exists(self.introspector.as_ref(), name)?
        {
            return Ok(false);
        }
        self.run_extractor(name)?;
        Ok(true)
    }

    fn resolve(&mut self, class: &str) -> Result<Option<TypeName>, ReflectionError> {
        let Ok(name) = TypeName::new(class) else {
            return Ok(None);
        };
        Ok(self.load_or_reflect(&name)?.then_some(name))
    }

    fn query<T: Default>(
        &mut self,
        class: &str,
        f: impl FnOnce(&ClassDescriptor) -> T,
    ) -> Result<T, ReflectionError> {
        let Some(name) = self.resolve(class)? else {
            return Ok(T::default());
        };
        Ok(self.data.descriptor(&name).map(f).unwrap_or_default())
    }

    fn query_method<T: Default>(
        &mut self,
        class: &str,
        method: &str,
        f: impl FnOnce(&MethodDescriptor) -> T,
    ) -> Result<T, ReflectionError> {
        self.query(class, |d| d.methods.get(method).map(f).unwrap_or_default())
    }

    fn query_property<T: Default>(
        &mut self,
        class: &str,
        property: &str,
        f: impl FnOnce(&PropertyDescriptor) -> T,
    ) -> Result<T, ReflectionError> {
        self.query(class, |d| d.properties.get(property).map(f).unwrap_or_default())
    }

    fn require_kind(
        &mut self,
        name: &str,
        kind: TypeKind,
    ) -> Result<TypeName, ReflectionError> {
        let misuse = || match kind {
            TypeKind::Interface => ReflectionError::NotAnInterface(name.to_string()),
            TypeKind::Class => ReflectionError::NotAClass(name.to_string()),
        };
        let type_name = TypeName::new(name).map_err(|_| misuse())?;
        self.initialize()?;

        let actual = match self.data.descriptor(&type_name) {
            Some(d) if d.is_interface => Some(TypeKind::Interface),
            Some(_) => Some(TypeKind::Class),
            None if self.tiers.is_frozen_state() => {
                self.tiers.load_class(&type_name, &mut self.data)?;
                self.data.descriptor(&type_name).map(|d| {
                    if d.is_interface {
                        TypeKind::Interface
                    } else {
                        TypeKind::Class
                    }
                })
            }
            None => self
                .expander
                .type_kind(self.introspector.as_ref(), &type_name)?,
        };
        if actual != Some(kind) {
            return Err(misuse());
        }
        self.load_or_reflect(&type_name)?;
        Ok(type_name)
    }

    // ------------------------------------------------------------------
    // Class queries
    // ------------------------------------------------------------------

    /// Whether the class is tracked. Never extracts.
    pub fn is_class_reflected(&mut self, class: &str) -> Result<bool, ReflectionError> {
        self.initialize()?;
        Ok(TypeName::new(class).is_ok_and(|name| self.data.contains(&name)))
    }

    /// Every tracked class name, sorted.
    pub fn all_class_names(&mut self) -> Result<Vec<TypeName>, ReflectionError> {
        self.initialize()?;
        Ok(self.data.classes.keys().cloned().collect())
    }

    /// The single implementation of an interface.
    ///
    /// With exactly two implementors, the one that is a generated object
    /// proxy wins. Any other count yields `None`.
    pub fn default_implementation_for_interface(
        &mut self,
        interface: &str,
    ) -> Result<Option<TypeName>, ReflectionError> {
        let interface = self.require_kind(interface, TypeKind::Interface)?;
        let found: Vec<TypeName> = self
            .data
            .descriptor(&interface)
            .map(|d| d.interface_implementors.iter().cloned().collect())
            .unwrap_or_default();

        match found.as_slice() {
            [only] => Ok(Some(only.clone())),
            [first, second] => {
                let proxy = TypeName::new(self.settings.object_proxy_interface.as_str())?;
                for candidate in [first, second] {
                    let is_proxy = self
                        .data
                        .descriptor(candidate)
                        .is_some_and(|d| d.interfaces.contains(&proxy));
                    if is_proxy {
                        return Ok(Some(candidate.clone()));
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    pub fn all_implementations_for_interface(
        &mut self,
        interface: &str,
    ) -> Result<Vec<TypeName>, ReflectionError> {
        let interface = self.require_kind(interface, TypeKind::Interface)?;
        Ok(self
            .data
            .descriptor(&interface)
            .map(|d| d.interface_implementors.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn all_subclasses_for_class(&mut self, class: &str) -> Result<Vec<TypeName>, ReflectionError> {
        let class = self.require_kind(class, TypeKind::Class)?;
        Ok(self
            .data
            .descriptor(&class)
            .map(|d| d.subclasses.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Classes carrying an attribute, from the index. Never extracts.
    pub fn class_names_by_attribute(
        &mut self,
        kind: &AttributeKind,
    ) -> Result<Vec<TypeName>, ReflectionError> {
        self.initialize()?;
        Ok(self
            .data
            .annotated_classes
            .get(kind)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn is_class_annotated_with(
        &mut self,
        class: &str,
        kind: &AttributeKind,
    ) -> Result<bool, ReflectionError> {
        self.query(class, |d| d.attributes.contains(kind))
    }

    /// Attributes of a class, optionally of one kind.
    pub fn class_attributes(
        &mut self,
        class: &str,
        kind: Option<&AttributeKind>,
    ) -> Result<Vec<Attribute>, ReflectionError> {
        self.query(class, |d| d.attributes.filtered(kind))
    }

    pub fn class_attribute(
        &mut self,
        class: &str,
        kind: &AttributeKind,
    ) -> Result<Option<Attribute>, ReflectionError> {
        self.query(class, |d| d.attributes.first(kind).cloned())
    }

    pub fn is_class_implementation_of(
        &mut self,
        class: &str,
        interface: &str,
    ) -> Result<bool, ReflectionError> {
        let Ok(interface) = TypeName::new(interface) else {
            return Ok(false);
        };
        self.query(class, |d| d.interfaces.contains(&interface))
    }

    pub fn is_class_abstract(&mut self, class: &str) -> Result<bool, ReflectionError> {
        self.query(class, |d| d.is_abstract)
    }

    pub fn is_class_final(&mut self, class: &str) -> Result<bool, ReflectionError> {
        self.query(class, |d| d.is_final)
    }

    pub fn class_property_names(&mut self, class: &str) -> Result<Vec<String>, ReflectionError> {
        self.query(class, |d| d.properties.keys().cloned().collect())
    }

    /// Built or cached schema of a class.
    pub fn class_schema(&mut self, class: &str) -> Result<Option<&ClassSchema>, ReflectionError> {
        let Some(name) = self.resolve(class)? else {
            return Ok(None);
        };
        Ok(self.data.schemata.get(&name))
    }

    // ------------------------------------------------------------------
    // Method queries
    // ------------------------------------------------------------------

    /// Classes with at least one method carrying an attribute.
    pub fn classes_with_methods_annotated_with(
        &mut self,
        kind: &AttributeKind,
    ) -> Result<Vec<TypeName>, ReflectionError> {
        self.initialize()?;
        Ok(self
            .data
            .classes_by_method_attributes
            .get(kind)
            .map(|by_class| by_class.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Methods of a class carrying an attribute.
    pub fn methods_annotated_with(
        &mut self,
        class: &str,
        kind: &AttributeKind,
    ) -> Result<Vec<String>, ReflectionError> {
        self.query(class, |d| {
            d.methods
                .iter()
                .filter(|(_, m)| m.attributes.contains(kind))
                .map(|(name, _)| name.clone())
                .collect()
        })
    }

    pub fn has_method(&mut self, class: &str, method: &str) -> Result<bool, ReflectionError> {
        self.query(class, |d| d.methods.contains_key(method))
    }

    pub fn is_method_final(&mut self, class: &str, method: &str) -> Result<bool, ReflectionError> {
        self.query_method(class, method, |m| m.is_final)
    }

    pub fn is_method_static(&mut self, class: &str, method: &str) -> Result<bool, ReflectionError> {
        self.query_method(class, method, |m| m.is_static)
    }

    pub fn is_method_public(&mut self, class: &str, method: &str) -> Result<bool, ReflectionError> {
        self.query_method(class, method, |m| m.visibility == Visibility::Public)
    }

    pub fn is_method_protected(&mut self, class: &str, method: &str) -> Result<bool, ReflectionError> {
        self.query_method(class, method, |m| m.visibility == Visibility::Protected)
    }

    pub fn is_method_private(&mut self, class: &str, method: &str) -> Result<bool, ReflectionError> {
        self.query_method(class, method, |m| m.visibility == Visibility::Private)
    }

    pub fn is_method_tagged_with(
        &mut self,
        class: &str,
        method: &str,
        tag: &str,
    ) -> Result<bool, ReflectionError> {
        let tag = tag.to_lowercase();
        self.query_method(class, method, |m| m.tags.contains_key(&tag))
    }

    pub fn method_tags_values(
        &mut self,
        class: &str,
        method: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, ReflectionError> {
        self.query_method(class, method, |m| m.tags.clone())
    }

    pub fn method_attributes(
        &mut self,
        class: &str,
        method: &str,
        kind: Option<&AttributeKind>,
    ) -> Result<Vec<Attribute>, ReflectionError> {
        self.query_method(class, method, |m| m.attributes.filtered(kind))
    }

    pub fn is_method_annotated_with(
        &mut self,
        class: &str,
        method: &str,
        kind: &AttributeKind,
    ) -> Result<bool, ReflectionError> {
        self.query_method(class, method, |m| m.attributes.contains(kind))
    }

    pub fn method_attribute(
        &mut self,
        class: &str,
        method: &str,
        kind: &AttributeKind,
    ) -> Result<Option<Attribute>, ReflectionError> {
        self.query_method(class, method, |m| m.attributes.first(kind).cloned())
    }

    /// Parameters in declaration order.
    pub fn method_parameters(
        &mut self,
        class: &str,
        method: &str,
    ) -> Result<Vec<ParameterDescriptor>, ReflectionError> {
        self.query_method(class, method, |m| m.parameters.clone())
    }

    pub fn method_declared_return_type(
        &mut self,
        class: &str,
        method: &str,
    ) -> Result<Option<String>, ReflectionError> {
        self.query_method(class, method, |m| m.declared_return_type.clone())
    }

    // ------------------------------------------------------------------
    // Property queries
    // ------------------------------------------------------------------

    pub fn property_names_by_tag(&mut self, class: &str, tag: &str) -> Result<Vec<String>, ReflectionError> {
        let tag = tag.to_lowercase();
        self.query(class, |d| {
            d.properties
                .iter()
                .filter(|(_, p)| p.tags.contains_key(&tag))
                .map(|(name, _)| name.clone())
                .collect()
        })
    }

    pub fn property_tags_values(
        &mut self,
        class: &str,
        property: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, ReflectionError> {
        self.query_property(class, property, |p| p.tags.clone())
    }

    pub fn property_tag_values(
        &mut self,
        class: &str,
        property: &str,
        tag: &str,
    ) -> Result<Vec<String>, ReflectionError> {
        let tag = tag.to_lowercase();
        self.query_property(class, property, |p| p.tags.get(&tag).cloned().unwrap_or_default())
    }

    /// Language-level type declaration of a property.
    pub fn property_type(&mut self, class: &str, property: &str) -> Result<Option<String>, ReflectionError> {
        self.query_property(class, property, |p| p.declared_type.clone())
    }

    pub fn is_property_private(&mut self, class: &str, property: &str) -> Result<bool, ReflectionError> {
        self.query_property(class, property, |p| p.visibility == Visibility::Private)
    }

    pub fn is_property_tagged_with(
        &mut self,
        class: &str,
        property: &str,
        tag: &str,
    ) -> Result<bool, ReflectionError> {
        let tag = tag.to_lowercase();
        self.query_property(class, property, |p| p.tags.contains_key(&tag))
    }

    pub fn is_property_annotated_with(
        &mut self,
        class: &str,
        property: &str,
        kind: &AttributeKind,
    ) -> Result<bool, ReflectionError> {
        self.query_property(class, property, |p| p.attributes.contains(kind))
    }

    pub fn property_names_by_attribute(
        &mut self,
        class: &str,
        kind: &AttributeKind,
    ) -> Result<Vec<String>, ReflectionError> {
        self.query(class, |d| {
            d.properties
                .iter()
                .filter(|(_, p)| p.attributes.contains(kind))
                .map(|(name, _)| name.clone())
                .collect()
        })
    }

    pub fn property_attributes(
        &mut self,
        class: &str,
        property: &str,
        kind: Option<&AttributeKind>,
    ) -> Result<Vec<Attribute>, ReflectionError> {
        self.query_property(class, property, |p| p.attributes.filtered(kind))
    }

    pub fn property_attribute(
        &mut self,
        class: &str,
        property: &str,
        kind: &AttributeKind,
    ) -> Result<Option<Attribute>, ReflectionError> {
        self.query_property(class, property, |p| p.attributes.first(kind).cloned())
    }
}
