//! reflection::attributes
//!
//! Typed attributes attached to classes, methods and properties.
//!
//! # Model
//!
//! [`Attribute`] is a closed set of well-known markers plus a `Custom`
//! escape hatch. [`AttributeKind`] identifies the type of an attribute and
//! is the key of [`AttributeSet`], a multi-map from kind to instances, so
//! filtering by kind is a map lookup.
//!
//! # Example
//!
//! ```
//! use classlens::reflection::attributes::{Attribute, AttributeKind, AttributeSet};
//!
//! let mut set = AttributeSet::new();
//! set.insert(Attribute::Entity);
//! set.insert(Attribute::Scope { value: "prototype".into() });
//!
//! assert!(set.contains(&AttributeKind::Entity));
//! assert_eq!(set.get(&AttributeKind::Scope).len(), 1);
//! assert!(!set.contains(&AttributeKind::ValueObject));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from attribute validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttributeError {
    #[error("custom attribute name cannot be empty")]
    EmptyName,

    #[error("custom attribute cannot use the built-in name '{0}'")]
    ReservedName(String),
}

/// An attribute instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attribute {
    /// Persistable entity with identity.
    Entity,
    /// Immutable value object.
    ValueObject {
        #[serde(default)]
        embedded: bool,
    },
    /// Embeddable value without its own identity.
    Embeddable,
    /// Lazily loaded class or property.
    Lazy,
    /// Property excluded from persistence.
    Transient,
    /// Dependency-injected property.
    Inject,
    /// Configuration-injected property.
    InjectConfiguration,
    /// Property forming part of the natural identity.
    Identity,
    /// Externally managed identifier property.
    Id,
    /// Object lifecycle scope (`prototype`, `singleton`, ...).
    Scope { value: String },
    /// Any other attribute.
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<String>,
    },
}

impl Attribute {
    /// The kind of this attribute.
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Entity => AttributeKind::Entity,
            Self::ValueObject { .. } => AttributeKind::ValueObject,
            Self::Embeddable => AttributeKind::Embeddable,
            Self::Lazy => AttributeKind::Lazy,
            Self::Transient => AttributeKind::Transient,
            Self::Inject => AttributeKind::Inject,
            Self::InjectConfiguration => AttributeKind::InjectConfiguration,
            Self::Identity => AttributeKind::Identity,
            Self::Id => AttributeKind::Id,
            Self::Scope { .. } => AttributeKind::Scope,
            Self::Custom { name, .. } => AttributeKind::Custom(name.clone()),
        }
    }

    /// Create a custom attribute without arguments.
    ///
    /// Built-in names are rejected so the kind survives serialization.
    pub fn custom(name: impl Into<String>) -> Result<Self, AttributeError> {
        let attribute = Self::Custom {
            name: name.into(),
            arguments: Vec::new(),
        };
        attribute.validate()?;
        Ok(attribute)
    }

    /// Check a deserialized attribute. Only custom names can be invalid.
    pub fn validate(&self) -> Result<(), AttributeError> {
        match self {
            Self::Custom { name, .. } if name.is_empty() => Err(AttributeError::EmptyName),
            Self::Custom { name, .. } if AttributeKind::is_builtin_name(name) => {
                Err(AttributeError::ReservedName(name.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Identity of an attribute type.
///
/// Serializes as its name. Well-known names are reserved; any other name
/// denotes a custom attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttributeKind {
    Entity,
    ValueObject,
    Embeddable,
    Lazy,
    Transient,
    Inject,
    InjectConfiguration,
    Identity,
    Id,
    Scope,
    Custom(String),
}

impl AttributeKind {
    /// The serialized name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Entity => "Entity",
            Self::ValueObject => "ValueObject",
            Self::Embeddable => "Embeddable",
            Self::Lazy => "Lazy",
            Self::Transient => "Transient",
            Self::Inject => "Inject",
            Self::InjectConfiguration => "InjectConfiguration",
            Self::Identity => "Identity",
            Self::Id => "Id",
            Self::Scope => "Scope",
            Self::Custom(name) => name,
        }
    }

    /// Whether `name` is the serialized name of a well-known kind.
    pub fn is_builtin_name(name: &str) -> bool {
        matches!(name.parse::<AttributeKind>(), Ok(kind) if !matches!(kind, Self::Custom(_)))
    }

    /// Whether a class carrying this kind gets a persistence schema.
    pub fn is_schema_marker(&self) -> bool {
        matches!(self, Self::Entity | Self::ValueObject | Self::Embeddable)
    }
}

impl FromStr for AttributeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "" => return Err("attribute kind cannot be empty".to_string()),
            "Entity" => Self::Entity,
            "ValueObject" => Self::ValueObject,
            "Embeddable" => Self::Embeddable,
            "Lazy" => Self::Lazy,
            "Transient" => Self::Transient,
            "Inject" => Self::Inject,
            "InjectConfiguration" => Self::InjectConfiguration,
            "Identity" => Self::Identity,
            "Id" => Self::Id,
            "Scope" => Self::Scope,
            other => Self::Custom(other.to_string()),
        };
        Ok(kind)
    }
}

impl TryFrom<String> for AttributeKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeKind> for String {
    fn from(kind: AttributeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Multi-map of attributes keyed by kind.
///
/// Instances of the same kind keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<AttributeKind, Vec<Attribute>>);

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute under its kind.
    pub fn insert(&mut self, attribute: Attribute) {
        self.0.entry(attribute.kind()).or_default().push(attribute);
    }

    /// All instances of `kind`, empty if none.
    pub fn get(&self, kind: &AttributeKind) -> &[Attribute] {
        self.0.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first instance of `kind`.
    pub fn first(&self, kind: &AttributeKind) -> Option<&Attribute> {
        self.get(kind).first()
    }

    pub fn contains(&self, kind: &AttributeKind) -> bool {
        self.0.contains_key(kind)
    }

    /// Kinds present in the set, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &AttributeKind> {
        self.0.keys()
    }

    /// Every instance, grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.values().flatten()
    }

    /// Instances of `kind`, or all instances when `kind` is `None`.
    pub fn filtered(&self, kind: Option<&AttributeKind>) -> Vec<Attribute> {
        match kind {
            Some(kind) => self.get(kind).to_vec(),
            None => self.iter().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = Self::new();
        for attribute in iter {
            set.insert(attribute);
        }
        set
    }
}
