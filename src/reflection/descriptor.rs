//! reflection::descriptor
//!
//! Class, method, parameter and property descriptors.
//!
//! # Pending vs Known
//!
//! A class name maps to a [`ClassEntry`]. `Pending` means the class is
//! known to exist but its descriptor has not been loaded or extracted yet;
//! `Known` carries the populated [`ClassDescriptor`].
//!
//! # Serialization
//!
//! Descriptors serialize compactly: false flags, absent options and empty
//! collections are omitted. All maps and sets are ordered, so identical
//! input always produces identical bytes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::attributes::AttributeSet;
use crate::core::types::{TypeName, Visibility};

fn is_false(value: &bool) -> bool {
    !*value
}

/// State of one class in the reflection index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClassEntry {
    /// Known to exist, not yet loaded.
    Pending,
    /// Fully extracted.
    Known(Box<ClassDescriptor>),
}

impl ClassEntry {
    /// The descriptor, if known.
    pub fn descriptor(&self) -> Option<&ClassDescriptor> {
        match self {
            Self::Known(descriptor) => Some(descriptor),
            Self::Pending => None,
        }
    }

    pub fn descriptor_mut(&mut self) -> Option<&mut ClassDescriptor> {
        match self {
            Self::Known(descriptor) => Some(descriptor),
            Self::Pending => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// Structural facts about one class or interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Abstract classes and interfaces.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_final: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_interface: bool,

    /// Direct parent class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TypeName>,

    /// Implemented interfaces, including inherited ones.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub interfaces: BTreeSet<TypeName>,

    /// Direct and indirect subclasses.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subclasses: BTreeSet<TypeName>,

    /// Concrete implementors, for interfaces.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub interface_implementors: BTreeSet<TypeName>,

    #[serde(default, skip_serializing_if = "AttributeSet::is_empty")]
    pub attributes: AttributeSet,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, MethodDescriptor>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyDescriptor>,
}

/// Facts about one method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_final: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_static: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_constructor: bool,

    pub visibility: Visibility,

    #[serde(default, skip_serializing_if = "AttributeSet::is_empty")]
    pub attributes: AttributeSet,

    /// Doc tags, minus ignored ones.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Vec<String>>,

    /// Parameters in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_return_type: Option<String>,

    pub declaring_class: TypeName,
}

impl MethodDescriptor {
    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Facts about one method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,

    /// Zero-based.
    pub position: usize,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_optional: bool,

    /// Fully-qualified type, or `mixed`.
    pub declared_type: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_array: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_by_reference: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allows_null: bool,

    /// Present only for optional parameters with a known default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    /// Type came from a language-level scalar declaration.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_scalar_declaration: bool,

    /// Resolved class of the language-level declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<TypeName>,
}

/// Facts about one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub visibility: Visibility,

    /// Language-level type declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,

    /// Doc tags, minus ignored ones. `var` values are expanded.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "AttributeSet::is_empty")]
    pub attributes: AttributeSet,

    pub declaring_class: TypeName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::attributes::Attribute;

    fn name(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    #[test]
    fn empty_descriptor_serializes_compactly() {
        let json = serde_json::to_string(&ClassDescriptor::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn entry_roundtrip() {
        let mut descriptor = ClassDescriptor {
            is_abstract: true,
            parent: Some(name("Acme::Base")),
            ..ClassDescriptor::default()
        };
        descriptor.attributes.insert(Attribute::Entity);
        descriptor.properties.insert(
            "total".into(),
            PropertyDescriptor {
                visibility: Visibility::Protected,
                declared_type: None,
                tags: BTreeMap::from([("var".into(), vec!["float".into()])]),
                attributes: AttributeSet::new(),
                declaring_class: name("Acme::Order"),
            },
        );

        let entry = ClassEntry::Known(Box::new(descriptor));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.starts_with(r#"{"state":"known""#));

        let parsed: ClassEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn pending_has_no_descriptor() {
        let entry: ClassEntry = serde_json::from_str(r#"{"state":"pending"}"#).unwrap();
        assert!(!entry.is_known());
        assert!(entry.descriptor().is_none());
    }

    #[test]
    fn parameter_lookup_by_name() {
        let method = MethodDescriptor {
            is_final: false,
            is_static: false,
            is_constructor: false,
            visibility: Visibility::Public,
            attributes: AttributeSet::new(),
            tags: BTreeMap::new(),
            parameters: vec![ParameterDescriptor {
                name: "amount".into(),
                position: 0,
                is_optional: false,
                declared_type: "float".into(),
                is_array: false,
                is_by_reference: false,
                allows_null: false,
                default_value: None,
                is_scalar_declaration: true,
                class: None,
            }],
            declared_return_type: None,
            declaring_class: name("Acme::Money"),
        };

        assert_eq!(method.parameter("amount").map(|p| p.position), Some(0));
        assert!(method.parameter("currency").is_none());
    }
}
