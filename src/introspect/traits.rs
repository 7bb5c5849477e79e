//! introspect::traits
//!
//! Collaborator contracts consumed by the reflection engine.
//!
//! # Collaborators
//!
//! - [`TypeIntrospector`] - Raw facts about one type (members, parent,
//!   interfaces, documentation text, imports)
//! - [`ModuleCatalog`] - Which types exist, grouped by package, and which
//!   packages are immutable
//! - [`AttributeReader`] - Typed attribute instances for a type, method or
//!   property
//!
//! The engine never assumes these calls are cheap and caches answers where
//! it can.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{PackageKey, TypeName, Visibility};
use crate::reflection::attributes::{Attribute, AttributeError};

/// Errors from introspection collaborators.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("failed to read catalog '{path}': {source}")]
    ReadError {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    ParseError(String),

    #[error("type '{0}' is declared more than once")]
    DuplicateType(TypeName),

    #[error("type '{name}' references unknown type '{missing}'")]
    UnknownReference { name: TypeName, missing: TypeName },

    #[error("inheritance cycle through '{0}'")]
    CyclicInheritance(TypeName),

    #[error("type '{name}' carries an invalid attribute: {source}")]
    InvalidAttribute {
        name: TypeName,
        source: AttributeError,
    },

    #[error("introspection unavailable: {0}")]
    Unavailable(String),
}

/// Whether a type is a class or an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

/// Import aliases in effect where a type is declared.
///
/// Aliases are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    aliases: BTreeMap<String, TypeName>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` for `target`.
    pub fn insert(&mut self, alias: &str, target: TypeName) {
        self.aliases.insert(alias.to_lowercase(), target);
    }

    /// Resolve an alias.
    pub fn resolve(&self, alias: &str) -> Option<&TypeName> {
        self.aliases.get(&alias.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Raw facts about one type.
///
/// Member lists include inherited members; `declaring_class` tells them
/// apart. `interfaces` includes inherited interfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct RawType {
    pub name: TypeName,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub is_final: bool,
    pub parent: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub doc: Option<String>,
    pub constants: BTreeMap<String, String>,
    pub properties: Vec<RawProperty>,
    pub methods: Vec<RawMethod>,
}

/// Raw facts about one property.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProperty {
    pub name: String,
    pub declaring_class: TypeName,
    pub visibility: Visibility,
    /// Language-level type declaration, if any.
    pub declared_type: Option<String>,
    pub doc: Option<String>,
}

/// Raw facts about one method.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMethod {
    pub name: String,
    pub declaring_class: TypeName,
    pub visibility: Visibility,
    pub is_final: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_constructor: bool,
    pub doc: Option<String>,
    /// Language-level return type, if any.
    pub return_type: Option<String>,
    pub parameters: Vec<RawParameter>,
}

/// Raw facts about one method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct RawParameter {
    pub name: String,
    pub position: usize,
    pub is_optional: bool,
    pub is_by_reference: bool,
    pub allows_null: bool,
    /// Language-level type declaration, if any.
    pub declared_type: Option<String>,
    /// Statically known default value.
    pub default_value: Option<serde_json::Value>,
}

/// One package as reported by the [`ModuleCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub key: PackageKey,
    pub class_names: BTreeSet<TypeName>,
    /// Immutable packages are trusted without re-extraction.
    pub frozen: bool,
}

/// Source of raw type facts.
pub trait TypeIntrospector: Send + Sync {
    /// Reflect a type. Returns `Ok(None)` if the type does not exist.
    fn reflect(&self, name: &TypeName) -> Result<Option<RawType>, IntrospectionError>;

    /// Whether `name` exists, and as what.
    fn type_kind(&self, name: &TypeName) -> Result<Option<TypeKind>, IntrospectionError>;

    /// Import aliases of the file declaring `name`.
    fn imports(&self, name: &TypeName) -> Result<ImportTable, IntrospectionError>;
}

/// Enumerates packages and their types.
pub trait ModuleCatalog: Send + Sync {
    /// All packages with their declared types.
    fn packages(&self) -> Result<Vec<PackageInfo>, IntrospectionError>;

    /// Union of all packages' types.
    fn available_class_names(&self) -> Result<BTreeSet<TypeName>, IntrospectionError> {
        Ok(self
            .packages()?
            .into_iter()
            .flat_map(|p| p.class_names)
            .collect())
    }

    /// Packages marked immutable.
    fn frozen_packages(&self) -> Result<Vec<PackageInfo>, IntrospectionError> {
        Ok(self.packages()?.into_iter().filter(|p| p.frozen).collect())
    }

    /// Look up one package.
    fn package(&self, key: &PackageKey) -> Result<Option<PackageInfo>, IntrospectionError> {
        Ok(self.packages()?.into_iter().find(|p| &p.key == key))
    }
}

/// Source of typed attributes.
pub trait AttributeReader: Send + Sync {
    fn class_attributes(&self, class: &TypeName) -> Result<Vec<Attribute>, IntrospectionError>;

    fn method_attributes(
        &self,
        class: &TypeName,
        method: &str,
    ) -> Result<Vec<Attribute>, IntrospectionError>;

    fn property_attributes(
        &self,
        class: &TypeName,
        property: &str,
    ) -> Result<Vec<Attribute>, IntrospectionError>;
}
