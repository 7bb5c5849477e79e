//! reflection::data
//!
//! The in-memory reflection index.
//!
//! # Contents
//!
//! - `classes` - Every tracked class, pending or known
//! - `schemata` - Persistence schemas of schema-bearing classes
//! - `annotated_classes` - Class attribute kind to classes carrying it
//! - `classes_by_method_attributes` - Method attribute kind to class to
//!   method names
//!
//! # Forgetting
//!
//! [`ReflectionData::forget`] removes a class and, transitively, all of its
//! subclasses from every index. The closure is computed with an explicit
//! worklist and visited set, so cyclic subclass records terminate.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::attributes::AttributeKind;
use super::descriptor::{ClassDescriptor, ClassEntry};
use super::schema::ClassSchema;
use crate::core::types::{Fingerprint, TypeName};

/// Snapshot of everything the engine knows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectionData {
    #[serde(default)]
    pub classes: BTreeMap<TypeName, ClassEntry>,

    #[serde(default)]
    pub schemata: BTreeMap<TypeName, ClassSchema>,

    #[serde(default)]
    pub annotated_classes: BTreeMap<AttributeKind, BTreeSet<TypeName>>,

    #[serde(default)]
    pub classes_by_method_attributes: BTreeMap<AttributeKind, BTreeMap<TypeName, BTreeSet<String>>>,
}

impl ReflectionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to compact JSON. Output is byte-stable for equal data.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Fingerprint of the serialized snapshot.
    pub fn fingerprint(&self) -> Result<Fingerprint, serde_json::Error> {
        Ok(Fingerprint::compute(self.to_json()?.as_bytes()))
    }

    /// The descriptor of a known class.
    pub fn descriptor(&self, name: &TypeName) -> Option<&ClassDescriptor> {
        self.classes.get(name).and_then(ClassEntry::descriptor)
    }

    pub fn descriptor_mut(&mut self, name: &TypeName) -> Option<&mut ClassDescriptor> {
        self.classes.get_mut(name).and_then(ClassEntry::descriptor_mut)
    }

    /// Tracked at all, pending or known.
    pub fn contains(&self, name: &TypeName) -> bool {
        self.classes.contains_key(name)
    }

    pub fn is_known(&self, name: &TypeName) -> bool {
        self.classes.get(name).is_some_and(ClassEntry::is_known)
    }

    /// Ancestors of a known class, nearest first.
    pub fn ancestors(&self, name: &TypeName) -> Vec<TypeName> {
        let mut ancestors = Vec::new();
        let mut seen = BTreeSet::from([name.clone()]);
        let mut current = self.descriptor(name).and_then(|d| d.parent.clone());

        while let Some(ancestor) = current {
            if !seen.insert(ancestor.clone()) {
                break;
            }
            current = self.descriptor(&ancestor).and_then(|d| d.parent.clone());
            ancestors.push(ancestor);
        }
        ancestors
    }

    pub fn index_class_attribute(&mut self, kind: AttributeKind, class: &TypeName) {
        self.annotated_classes
            .entry(kind)
            .or_default()
            .insert(class.clone());
    }

    pub fn index_method_attribute(&mut self, kind: AttributeKind, class: &TypeName, method: &str) {
        self.classes_by_method_attributes
            .entry(kind)
            .or_default()
            .entry(class.clone())
            .or_default()
            .insert(method.to_string());
    }

    /// Copy of the data restricted to `classes`.
    pub fn filter_to(&self, classes: &BTreeSet<TypeName>) -> ReflectionData {
        let annotated_classes = self
            .annotated_classes
            .iter()
            .map(|(kind, names)| (kind.clone(), names & classes))
            .filter(|(_, names)| !names.is_empty())
            .collect();

        let classes_by_method_attributes = self
            .classes_by_method_attributes
            .iter()
            .map(|(kind, by_class)| {
                let kept: BTreeMap<_, _> = by_class
                    .iter()
                    .filter(|(class, _)| classes.contains(*class))
                    .map(|(class, methods)| (class.clone(), methods.clone()))
                    .collect();
                (kind.clone(), kept)
            })
            .filter(|(_, by_class)| !by_class.is_empty())
            .collect();

        ReflectionData {
            classes: self
                .classes
                .iter()
                .filter(|(name, _)| classes.contains(*name))
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect(),
            schemata: self
                .schemata
                .iter()
                .filter(|(name, _)| classes.contains(*name))
                .map(|(name, schema)| (name.clone(), schema.clone()))
                .collect(),
            annotated_classes,
            classes_by_method_attributes,
        }
    }

    /// Merge `other` into `self`. Entries of `other` override; indices are
    /// unioned.
    pub fn merge(&mut self, other: ReflectionData) {
        self.classes.extend(other.classes);
        self.schemata.extend(other.schemata);
        for (kind, names) in other.annotated_classes {
            self.annotated_classes.entry(kind).or_default().extend(names);
        }
        for (kind, by_class) in other.classes_by_method_attributes {
            let target = self.classes_by_method_attributes.entry(kind).or_default();
            for (class, methods) in by_class {
                target.entry(class).or_default().extend(methods);
            }
        }
    }

    /// `name` and all classes reachable through recorded subclasses.
    pub fn collect_forget_closure(&self, name: &TypeName) -> Vec<TypeName> {
        let mut closure = Vec::new();
        let mut visited = BTreeSet::new();
        let mut work = vec![name.clone()];

        while let Some(current) = work.pop() {
            if !visited.insert(current.clone()) {
                warn!(class = %current, "recursion detected while forgetting, skipping");
                continue;
            }
            if let Some(descriptor) = self.descriptor(&current) {
                work.extend(descriptor.subclasses.iter().rev().cloned());
            }
            closure.push(current);
        }
        closure
    }

    /// Forget a class and its subclasses. Returns the forgotten names that
    /// were tracked. Forgetting an untracked class is a no-op.
    pub fn forget(&mut self, name: &TypeName) -> Vec<TypeName> {
        let closure: Vec<TypeName> = self
            .collect_forget_closure(name)
            .into_iter()
            .filter(|c| self.contains(c))
            .collect();
        if closure.is_empty() {
            return closure;
        }
        let doomed: BTreeSet<&TypeName> = closure.iter().collect();

        for entry in self.classes.values_mut() {
            if let Some(descriptor) = entry.descriptor_mut() {
                descriptor.subclasses.retain(|c| !doomed.contains(c));
                descriptor.interface_implementors.retain(|c| !doomed.contains(c));
            }
        }

        for names in self.annotated_classes.values_mut() {
            names.retain(|c| !doomed.contains(c));
        }
        self.annotated_classes.retain(|_, names| !names.is_empty());

        for by_class in self.classes_by_method_attributes.values_mut() {
            by_class.retain(|c, _| !doomed.contains(c));
        }
        self.classes_by_method_attributes
            .retain(|_, by_class| !by_class.is_empty());

        for class in &closure {
            self.schemata.remove(class);
            self.classes.remove(class);
            debug!(class = %class, "forgot class");
        }
        closure
    }
}
