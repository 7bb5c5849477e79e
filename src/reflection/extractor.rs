//! reflection::extractor
//!
//! Walks a type through the introspection collaborators and records its
//! descriptor.
//!
//! # Algorithm
//!
//! For a class `C`:
//! - Proxies are refused
//! - A known `C` is left untouched
//! - The parent is extracted first, then `C` is registered in the
//!   `subclasses` set of every ancestor
//! - Each interface is extracted; a concrete `C` is registered as an
//!   implementor
//! - Class attributes are recorded and indexed
//! - Properties and methods are recorded
//!
//! Parents are extracted recursively. An in-progress set turns an
//! inheritance cycle into an error instead of unbounded recursion.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::attributes::{AttributeKind, AttributeSet};
use super::data::ReflectionData;
use super::descriptor::{
    ClassDescriptor, ClassEntry, MethodDescriptor, ParameterDescriptor, PropertyDescriptor,
};
use super::error::ReflectionError;
use super::expander::TypeExpander;
use crate::core::config::ReflectionSettings;
use crate::core::doc_tags::DocComment;
use crate::core::type_expr::{is_simple_type, normalize, MIXED};
use crate::core::types::TypeName;
use crate::introspect::{
    AttributeReader, RawMethod, RawParameter, RawProperty, TypeIntrospector, TypeKind,
};

/// One extraction run over borrowed engine state.
pub struct Extractor<'a> {
    data: &'a mut ReflectionData,
    expander: &'a mut TypeExpander,
    introspector: &'a dyn TypeIntrospector,
    attributes: &'a dyn AttributeReader,
    settings: &'a ReflectionSettings,
    updated: &'a mut BTreeSet<TypeName>,
    in_progress: BTreeSet<TypeName>,
}

impl<'a> Extractor<'a> {
    pub fn new(
        data: &'a mut ReflectionData,
        expander: &'a mut TypeExpander,
        introspector: &'a dyn TypeIntrospector,
        attributes: &'a dyn AttributeReader,
        settings: &'a ReflectionSettings,
        updated: &'a mut BTreeSet<TypeName>,
    ) -> Self {
        Self {
            data,
            expander,
            introspector,
            attributes,
            settings,
            updated,
            in_progress: BTreeSet::new(),
        }
    }

    /// Extract `name` and everything it depends on. No-op if already known.
    pub fn extract(&mut self, name: &TypeName) -> Result<(), ReflectionError> {
        if self.settings.is_proxy_name(name.as_str()) {
            return Err(ReflectionError::InvalidClass(name.clone()));
        }
        if self.data.is_known(name) {
            return Ok(());
        }
        if !self.in_progress.insert(name.clone()) {
            return Err(ReflectionError::CyclicInheritance(name.clone()));
        }

        let result = self.extract_class(name);
        self.in_progress.remove(name);
        result
    }

    fn extract_class(&mut self, name: &TypeName) -> Result<(), ReflectionError> {
        let raw = self
            .introspector
            .reflect(name)?
            .ok_or_else(|| ReflectionError::ClassLoadingFailed(name.clone()))?;
        debug!(class = %name, "reflecting class");

        let is_interface = raw.kind == TypeKind::Interface;
        let mut descriptor = ClassDescriptor {
            is_abstract: raw.is_abstract || is_interface,
            is_final: raw.is_final,
            is_interface,
            parent: raw.parent.clone(),
            interfaces: raw.interfaces.iter().cloned().collect(),
            constants: raw.constants.clone(),
            ..ClassDescriptor::default()
        };

        if let Some(parent) = &raw.parent {
            self.extract(parent)?;
            let mut ancestors = vec![parent.clone()];
            ancestors.extend(self.data.ancestors(parent));
            for ancestor in ancestors {
                if let Some(d) = self.data.descriptor_mut(&ancestor) {
                    d.subclasses.insert(name.clone());
                }
            }
        }

        for interface in &raw.interfaces {
            self.extract(interface)?;
            if !descriptor.is_abstract {
                if let Some(d) = self.data.descriptor_mut(interface) {
                    d.interface_implementors.insert(name.clone());
                }
            }
        }

        for attribute in self.attributes.class_attributes(name)? {
            self.data.index_class_attribute(attribute.kind(), name);
            descriptor.attributes.insert(attribute);
        }

        for property in &raw.properties {
            let reflected = self.reflect_property(name, property)?;
            descriptor.properties.insert(property.name.clone(), reflected);
        }

        for method in &raw.methods {
            let reflected = self.reflect_method(name, method)?;
            descriptor.methods.insert(method.name.clone(), reflected);
        }

        self.data
            .classes
            .insert(name.clone(), ClassEntry::Known(Box::new(descriptor)));
        self.updated.insert(name.clone());
        Ok(())
    }

    fn reflect_property(
        &mut self,
        class: &TypeName,
        raw: &RawProperty,
    ) -> Result<PropertyDescriptor, ReflectionError> {
        let mut tags = BTreeMap::new();

        for (tag, values) in DocComment::parse_opt(raw.doc.as_deref()).into_tags() {
            if self.settings.is_ignored_tag(&tag) {
                continue;
            }
            let values = if tag == "var" {
                match self.inherited_var_tag(class, raw) {
                    Some(inherited) => inherited,
                    None => values
                        .iter()
                        .map(|v| self.expand_tag_value(&raw.declaring_class, v))
                        .collect::<Result<Vec<_>, _>>()?,
                }
            } else {
                values
            };
            tags.insert(tag, values);
        }

        let attributes: AttributeSet = self
            .attributes
            .property_attributes(&raw.declaring_class, &raw.name)?
            .into_iter()
            .collect();

        Ok(PropertyDescriptor {
            visibility: raw.visibility,
            declared_type: raw.declared_type.clone(),
            tags,
            attributes,
            declaring_class: raw.declaring_class.clone(),
        })
    }

    /// The already expanded `var` values of an inherited declaration.
    fn inherited_var_tag(&self, class: &TypeName, raw: &RawProperty) -> Option<Vec<String>> {
        if &raw.declaring_class == class {
            return None;
        }
        self.data
            .descriptor(&raw.declaring_class)?
            .properties
            .get(&raw.name)?
            .tags
            .get("var")
            .cloned()
    }

    /// Expand the first token of a tag value, keeping the remainder.
    fn expand_tag_value(
        &mut self,
        declaring: &TypeName,
        value: &str,
    ) -> Result<String, ReflectionError> {
        let (first, rest) = match value.find(char::is_whitespace) {
            Some(index) => value.split_at(index),
            None => (value, ""),
        };
        let expanded = self.expander.expand(self.introspector, declaring, first)?;
        Ok(format!("{expanded}{rest}"))
    }

    fn reflect_method(
        &mut self,
        class: &TypeName,
        raw: &RawMethod,
    ) -> Result<MethodDescriptor, ReflectionError> {
        let attributes: AttributeSet = self
            .attributes
            .method_attributes(&raw.declaring_class, &raw.name)?
            .into_iter()
            .collect();
        let kinds: Vec<AttributeKind> = attributes.kinds().cloned().collect();
        for kind in kinds {
            self.data.index_method_attribute(kind, class, &raw.name);
        }

        let mut tags = DocComment::parse_opt(raw.doc.as_deref()).into_tags();
        tags.retain(|tag, _| !self.settings.is_ignored_tag(tag));

        let param_tags = tags.get("param").cloned().unwrap_or_default();
        let mut parameters = Vec::with_capacity(raw.parameters.len());
        for parameter in &raw.parameters {
            let tag = param_tags.get(parameter.position).map(String::as_str);
            parameters.push(self.reflect_parameter(class, raw, parameter, tag)?);
        }

        Ok(MethodDescriptor {
            is_final: raw.is_final,
            is_static: raw.is_static,
            is_constructor: raw.is_constructor,
            visibility: raw.visibility,
            attributes,
            tags,
            parameters,
            declared_return_type: raw.return_type.as_deref().map(normalize),
            declaring_class: raw.declaring_class.clone(),
        })
    }

    fn reflect_parameter(
        &mut self,
        class: &TypeName,
        method: &RawMethod,
        raw: &RawParameter,
        tag: Option<&str>,
    ) -> Result<ParameterDescriptor, ReflectionError> {
        let declared = raw
            .declared_type
            .as_deref()
            .map(|t| t.trim().trim_start_matches('?'))
            .filter(|t| !t.is_empty());

        let class_ref = match declared {
            Some(t) if !is_simple_type(t) && t != MIXED => match TypeName::new(t) {
                Ok(name) if self.expander.type_exists(self.introspector, &name)? => Some(name),
                _ => None,
            },
            _ => None,
        };

        let tokens: Vec<&str> = tag.map(|t| t.split_whitespace().collect()).unwrap_or_default();
        let (declared_type, is_scalar_declaration) = if tokens.len() >= 2 {
            let expanded = self
                .expander
                .expand(self.introspector, &method.declaring_class, tokens[0])?;
            (expanded, false)
        } else {
            match (declared, &class_ref) {
                (Some(t), _) if is_simple_type(t) => (normalize(t), true),
                (_, Some(resolved)) => (resolved.to_string(), false),
                _ => (MIXED.to_string(), false),
            }
        };

        if self.settings.log_incorrect_doc_comment_hints {
            self.check_param_hint(class, method, raw, tag, &tokens, &declared_type, &class_ref);
        }

        Ok(ParameterDescriptor {
            name: raw.name.clone(),
            position: raw.position,
            is_optional: raw.is_optional,
            declared_type,
            is_array: declared == Some("array"),
            is_by_reference: raw.is_by_reference,
            allows_null: raw.allows_null,
            default_value: if raw.is_optional {
                raw.default_value.clone()
            } else {
                None
            },
            is_scalar_declaration,
            class: class_ref,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn check_param_hint(
        &self,
        class: &TypeName,
        method: &RawMethod,
        raw: &RawParameter,
        tag: Option<&str>,
        tokens: &[&str],
        declared_type: &str,
        class_ref: &Option<TypeName>,
    ) {
        let Some(tag) = tag else {
            debug!(
                class = %class,
                method = %method.name,
                parameter = %raw.name,
                "missing @param tag"
            );
            return;
        };
        if tokens.len() < 2 {
            debug!(
                class = %class,
                method = %method.name,
                parameter = %raw.name,
                tag,
                "@param tag should name type and parameter"
            );
            return;
        }

        if let Some(resolved) = class_ref {
            if declared_type.trim_end_matches("|null") != resolved.as_str() {
                debug!(
                    class = %class,
                    method = %method.name,
                    parameter = %raw.name,
                    documented = declared_type,
                    declared = %resolved,
                    "@param type does not match signature"
                );
            }
        }

        let documented_name = tokens[1].trim_start_matches(['$', '&']);
        if documented_name != raw.name {
            debug!(
                class = %class,
                method = %method.name,
                parameter = %raw.name,
                documented = documented_name,
                "@param name does not match signature"
            );
        }
    }
}
