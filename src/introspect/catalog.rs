//! introspect::catalog
//!
//! In-memory catalog of type definitions.
//!
//! # Overview
//!
//! [`StaticCatalog`] implements all three collaborator traits from a set of
//! declarative [`PackageDef`]s. It is loaded from JSON by the CLI and built
//! fluently in tests.
//!
//! # Format
//!
//! ```json
//! {
//!   "packages": [{
//!     "key": "Acme.Shop",
//!     "frozen": false,
//!     "types": [{
//!       "name": "Acme::Shop::Model::Order",
//!       "attributes": [{ "kind": "entity" }],
//!       "properties": [{ "name": "total", "doc": "/** @var float */" }],
//!       "methods": [{ "name": "__construct", "constructor": true }]
//!     }]
//!   }]
//! }
//! ```
//!
//! # Inheritance
//!
//! `reflect` merges members along the parent chain. Private members of
//! ancestors are not inherited. Interfaces are collected transitively from
//! the class, its ancestors, and interfaces extending other interfaces.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::traits::{
    AttributeReader, ImportTable, IntrospectionError, ModuleCatalog, PackageInfo, RawMethod,
    RawParameter, RawProperty, RawType, TypeIntrospector, TypeKind,
};
use crate::core::types::{PackageKey, TypeName, Visibility};
use crate::reflection::attributes::Attribute;

/// Top-level catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub packages: Vec<PackageDef>,
}

/// One package and the types it declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDef {
    pub key: PackageKey,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

impl PackageDef {
    pub fn new(key: PackageKey) -> Self {
        Self {
            key,
            frozen: false,
            types: Vec::new(),
        }
    }

    /// Mark the package immutable.
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.push(def);
        self
    }
}

/// A class or interface definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDef {
    pub name: TypeName,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub parent: Option<TypeName>,
    #[serde(default)]
    pub interfaces: Vec<TypeName>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub constants: BTreeMap<String, String>,
    #[serde(default)]
    pub imports: BTreeMap<String, TypeName>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    /// A concrete class.
    pub fn class(name: TypeName) -> Self {
        Self {
            name,
            kind: TypeKind::Class,
            is_abstract: false,
            is_final: false,
            parent: None,
            interfaces: Vec::new(),
            doc: None,
            constants: BTreeMap::new(),
            imports: BTreeMap::new(),
            attributes: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// An interface.
    pub fn interface(name: TypeName) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn final_(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn extends(mut self, parent: TypeName) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn implements(mut self, interface: TypeName) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn import(mut self, alias: impl Into<String>, target: TypeName) -> Self {
        self.imports.insert(alias.into(), target);
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }
}

/// A property definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDef {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "type")]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Protected,
            declared_type: None,
            doc: None,
            attributes: Vec::new(),
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn typed(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A method definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDef {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default, rename = "constructor")]
    pub is_constructor: bool,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_final: false,
            is_static: false,
            is_abstract: false,
            is_constructor: false,
            doc: None,
            return_type: None,
            attributes: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// A public constructor.
    pub fn constructor() -> Self {
        Self {
            is_constructor: true,
            ..Self::new("__construct")
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn final_(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn parameter(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// A method parameter definition. Position is the index in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDef {
    pub name: String,
    #[serde(default, rename = "type")]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub by_reference: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            optional: false,
            by_reference: false,
            nullable: false,
            default: None,
        }
    }

    pub fn typed(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// Make the parameter optional with a known default.
    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.optional = true;
        self.default = Some(value);
        self
    }

    pub fn by_reference(mut self) -> Self {
        self.by_reference = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

fn validate_attributes(def: &TypeDef) -> Result<(), IntrospectionError> {
    let members = def
        .properties
        .iter()
        .flat_map(|p| &p.attributes)
        .chain(def.methods.iter().flat_map(|m| &m.attributes));
    for attribute in def.attributes.iter().chain(members) {
        attribute
            .validate()
            .map_err(|source| IntrospectionError::InvalidAttribute {
                name: def.name.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Declarative implementation of every introspection collaborator.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    packages: Vec<PackageDef>,
    /// Type name to (package index, type index).
    index: BTreeMap<TypeName, (usize, usize)>,
}

impl StaticCatalog {
    /// Build a catalog, rejecting duplicate type names and custom
    /// attributes that reuse a built-in name.
    pub fn new(packages: Vec<PackageDef>) -> Result<Self, IntrospectionError> {
        let mut index = BTreeMap::new();
        for (p, package) in packages.iter().enumerate() {
            for (t, def) in package.types.iter().enumerate() {
                if index.insert(def.name.clone(), (p, t)).is_some() {
                    return Err(IntrospectionError::DuplicateType(def.name.clone()));
                }
                validate_attributes(def)?;
            }
        }
        Ok(Self { packages, index })
    }

    /// Parse a catalog from JSON.
    pub fn from_json(json: &str) -> Result<Self, IntrospectionError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| IntrospectionError::ParseError(e.to_string()))?;
        Self::new(file.packages)
    }

    /// Load a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self, IntrospectionError> {
        let json = fs::read_to_string(path).map_err(|e| IntrospectionError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json)
    }

    /// Serialize the catalog back to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, IntrospectionError> {
        let file = CatalogFile {
            packages: self.packages.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| IntrospectionError::ParseError(e.to_string()))
    }

    fn def(&self, name: &TypeName) -> Option<&TypeDef> {
        self.index
            .get(name)
            .map(|&(p, t)| &self.packages[p].types[t])
    }

    fn require(&self, from: &TypeName, name: &TypeName) -> Result<&TypeDef, IntrospectionError> {
        self.def(name)
            .ok_or_else(|| IntrospectionError::UnknownReference {
                name: from.clone(),
                missing: name.clone(),
            })
    }

    /// The type followed by its ancestors, nearest first.
    fn chain(&self, def: &TypeDef) -> Result<Vec<&TypeDef>, IntrospectionError> {
        let mut chain = vec![self.require(&def.name, &def.name)?];
        let mut seen = BTreeSet::from([def.name.clone()]);
        let mut current = def;

        while let Some(parent) = &current.parent {
            if !seen.insert(parent.clone()) {
                return Err(IntrospectionError::CyclicInheritance(parent.clone()));
            }
            let parent_def = self.require(&current.name, parent)?;
            chain.push(parent_def);
            current = parent_def;
        }
        Ok(chain)
    }

    fn all_interfaces(&self, chain: &[&TypeDef]) -> Result<Vec<TypeName>, IntrospectionError> {
        let mut found = BTreeSet::new();
        let mut work: Vec<(TypeName, TypeName)> = chain
            .iter()
            .flat_map(|def| def.interfaces.iter().map(|i| (def.name.clone(), i.clone())))
            .collect();

        while let Some((from, iface)) = work.pop() {
            if !found.insert(iface.clone()) {
                continue;
            }
            let def = self.require(&from, &iface)?;
            work.extend(def.interfaces.iter().map(|i| (iface.clone(), i.clone())));
        }
        Ok(found.into_iter().collect())
    }

    fn find_member<'a, T>(
        &'a self,
        class: &TypeName,
        members: impl Fn(&'a TypeDef) -> &'a [T],
        matches: impl Fn(&T) -> bool,
    ) -> Result<Option<&'a T>, IntrospectionError> {
        let Some(def) = self.def(class) else {
            return Ok(None);
        };
        for def in self.chain(def)? {
            if let Some(member) = members(def).iter().find(|m| matches(m)) {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }
}

impl TypeIntrospector for StaticCatalog {
    fn reflect(&self, name: &TypeName) -> Result<Option<RawType>, IntrospectionError> {
        let Some(def) = self.def(name) else {
            return Ok(None);
        };
        let chain = self.chain(def)?;

        let mut properties = Vec::new();
        let mut methods = Vec::new();
        let mut constants = BTreeMap::new();
        let mut seen_properties = BTreeSet::new();
        let mut seen_methods = BTreeSet::new();

        for (depth, ancestor) in chain.iter().enumerate() {
            for p in &ancestor.properties {
                if depth > 0 && p.visibility == Visibility::Private {
                    continue;
                }
                if seen_properties.insert(p.name.clone()) {
                    properties.push(RawProperty {
                        name: p.name.clone(),
                        declaring_class: ancestor.name.clone(),
                        visibility: p.visibility,
                        declared_type: p.declared_type.clone(),
                        doc: p.doc.clone(),
                    });
                }
            }

            for m in &ancestor.methods {
                if depth > 0 && m.visibility == Visibility::Private {
                    continue;
                }
                if seen_methods.insert(m.name.clone()) {
                    methods.push(RawMethod {
                        name: m.name.clone(),
                        declaring_class: ancestor.name.clone(),
                        visibility: m.visibility,
                        is_final: m.is_final,
                        is_static: m.is_static,
                        is_abstract: m.is_abstract,
                        is_constructor: m.is_constructor,
                        doc: m.doc.clone(),
                        return_type: m.return_type.clone(),
                        parameters: m
                            .parameters
                            .iter()
                            .enumerate()
                            .map(|(position, p)| RawParameter {
                                name: p.name.clone(),
                                position,
                                is_optional: p.optional,
                                is_by_reference: p.by_reference,
                                allows_null: p.nullable,
                                declared_type: p.declared_type.clone(),
                                default_value: p.default.clone(),
                            })
                            .collect(),
                    });
                }
            }

            for (k, v) in &ancestor.constants {
                constants.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        Ok(Some(RawType {
            name: def.name.clone(),
            kind: def.kind,
            is_abstract: def.is_abstract,
            is_final: def.is_final,
            parent: def.parent.clone(),
            interfaces: self.all_interfaces(&chain)?,
            doc: def.doc.clone(),
            constants,
            properties,
            methods,
        }))
    }

    fn type_kind(&self, name: &TypeName) -> Result<Option<TypeKind>, IntrospectionError> {
        Ok(self.def(name).map(|def| def.kind))
    }

    fn imports(&self, name: &TypeName) -> Result<ImportTable, IntrospectionError> {
        let mut table = ImportTable::new();
        if let Some(def) = self.def(name) {
            for (alias, target) in &def.imports {
                table.insert(alias, target.clone());
            }
        }
        Ok(table)
    }
}

impl ModuleCatalog for StaticCatalog {
    fn packages(&self) -> Result<Vec<PackageInfo>, IntrospectionError> {
        Ok(self
            .packages
            .iter()
            .map(|p| PackageInfo {
                key: p.key.clone(),
                class_names: p.types.iter().map(|t| t.name.clone()).collect(),
                frozen: p.frozen,
            })
            .collect())
    }
}

impl AttributeReader for StaticCatalog {
    fn class_attributes(&self, class: &TypeName) -> Result<Vec<Attribute>, IntrospectionError> {
        Ok(self
            .def(class)
            .map(|def| def.attributes.clone())
            .unwrap_or_default())
    }

    fn method_attributes(
        &self,
        class: &TypeName,
        method: &str,
    ) -> Result<Vec<Attribute>, IntrospectionError> {
        Ok(self
            .find_member(class, |d| d.methods.as_slice(), |m| m.name == method)?
            .map(|m| m.attributes.clone())
            .unwrap_or_default())
    }

    fn property_attributes(
        &self,
        class: &TypeName,
        property: &str,
    ) -> Result<Vec<Attribute>, IntrospectionError> {
        Ok(self
            .find_member(class, |d| d.properties.as_slice(), |p| p.name == property)?
            .map(|p| p.attributes.clone())
            .unwrap_or_default())
    }
}
