//! reflection::schema
//!
//! Persistence view of a class.
//!
//! # Invariants
//!
//! Enforced at mutation time; a failed mutation leaves the schema unchanged.
//! - A value object has no identity properties and no repository
//! - An identity property must already be a property and must not be lazy
//!
//! # Example
//!
//! ```
//! use classlens::core::types::TypeName;
//! use classlens::reflection::schema::{ClassSchema, ModelKind};
//!
//! let mut schema = ClassSchema::new(TypeName::new("Acme::Money").unwrap());
//! schema.add_property("amount", "float", false, false).unwrap();
//! schema.set_model_kind(ModelKind::ValueObject);
//!
//! assert!(schema.mark_as_identity_property("amount").is_err());
//! assert!(!schema.is_aggregate_root());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::type_expr::{parse_type, DocTypeError};
use crate::core::types::TypeName;

/// Errors from schema mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("value object '{class}' cannot have identity property '{property}'")]
    ValueObjectIdentity { class: TypeName, property: String },

    #[error("value object '{class}' cannot be bound to a repository")]
    ValueObjectRepository { class: TypeName },

    #[error("property '{property}' is not part of the schema of '{class}'")]
    UnknownProperty { class: TypeName, property: String },

    #[error("lazy property '{property}' of '{class}' cannot be an identity property")]
    LazyIdentity { class: TypeName, property: String },

    #[error("invalid type for property '{property}' of '{class}': {source}")]
    InvalidType {
        class: TypeName,
        property: String,
        source: DocTypeError,
    },
}

/// How a class is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelKind {
    #[default]
    Entity,
    ValueObject,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => write!(f, "entity"),
            Self::ValueObject => write!(f, "value object"),
        }
    }
}

/// One persisted property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub type_name: String,
    pub element_type: Option<String>,
    pub lazy: bool,
    pub transient: bool,
}

/// Persistence-relevant projection of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSchema {
    class_name: TypeName,
    model_kind: ModelKind,
    lazy_loadable: bool,
    repository_class_name: Option<TypeName>,
    properties: BTreeMap<String, SchemaProperty>,
    identity_properties: BTreeMap<String, String>,
}

impl ClassSchema {
    /// An empty entity schema.
    pub fn new(class_name: TypeName) -> Self {
        Self {
            class_name,
            model_kind: ModelKind::Entity,
            lazy_loadable: false,
            repository_class_name: None,
            properties: BTreeMap::new(),
            identity_properties: BTreeMap::new(),
        }
    }

    pub fn class_name(&self) -> &TypeName {
        &self.class_name
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    /// Switching to a value object drops identity properties and repository.
    pub fn set_model_kind(&mut self, kind: ModelKind) {
        self.model_kind = kind;
        if kind == ModelKind::ValueObject {
            self.identity_properties.clear();
            self.repository_class_name = None;
        }
    }

    pub fn is_lazy_loadable(&self) -> bool {
        self.lazy_loadable
    }

    pub fn set_lazy_loadable(&mut self, lazy: bool) {
        self.lazy_loadable = lazy;
    }

    pub fn repository_class_name(&self) -> Option<&TypeName> {
        self.repository_class_name.as_ref()
    }

    /// Bind or unbind a repository. Binding fails for value objects.
    pub fn set_repository_class_name(
        &mut self,
        repository: Option<TypeName>,
    ) -> Result<(), SchemaError> {
        if repository.is_some() && self.model_kind == ModelKind::ValueObject {
            return Err(SchemaError::ValueObjectRepository {
                class: self.class_name.clone(),
            });
        }
        self.repository_class_name = repository;
        Ok(())
    }

    /// Bound to a repository.
    pub fn is_aggregate_root(&self) -> bool {
        self.repository_class_name.is_some()
    }

    /// Add or replace a property. `type_expr` must be a well-formed type
    /// expression.
    pub fn add_property(
        &mut self,
        name: &str,
        type_expr: &str,
        lazy: bool,
        transient: bool,
    ) -> Result<(), SchemaError> {
        let parsed = parse_type(type_expr).map_err(|source| SchemaError::InvalidType {
            class: self.class_name.clone(),
            property: name.to_string(),
            source,
        })?;
        self.properties.insert(
            name.to_string(),
            SchemaProperty {
                type_name: parsed.type_name,
                element_type: parsed.element_type,
                lazy,
                transient,
            },
        );
        Ok(())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, SchemaProperty> {
        &self.properties
    }

    /// Whether the property holds a collection.
    pub fn is_multi_valued_property(&self, name: &str) -> bool {
        self.property(name)
            .is_some_and(|p| p.element_type.is_some() || p.type_name == "array")
    }

    /// Register an existing, non-lazy property as part of the identity.
    pub fn mark_as_identity_property(&mut self, name: &str) -> Result<(), SchemaError> {
        if self.model_kind == ModelKind::ValueObject {
            return Err(SchemaError::ValueObjectIdentity {
                class: self.class_name.clone(),
                property: name.to_string(),
            });
        }
        let property = self
            .properties
            .get(name)
            .ok_or_else(|| SchemaError::UnknownProperty {
                class: self.class_name.clone(),
                property: name.to_string(),
            })?;
        if property.lazy {
            return Err(SchemaError::LazyIdentity {
                class: self.class_name.clone(),
                property: name.to_string(),
            });
        }

        let type_name = property.type_name.clone();
        self.identity_properties.insert(name.to_string(), type_name);
        Ok(())
    }

    /// Identity property names to their types.
    pub fn identity_properties(&self) -> &BTreeMap<String, String> {
        &self.identity_properties
    }
}
