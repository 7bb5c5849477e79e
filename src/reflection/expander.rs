//! reflection::expander
//!
//! Resolves shorthand type references in doc tags to fully-qualified names.
//!
//! # Rules
//!
//! Applied in order to the expression with nullable markers removed:
//! 1. `T[]` is rewritten to `array<T>`; `Outer<Inner>` expands both parts
//! 2. `mixed`, built-in scalars and names with a leading `::` are normalized
//! 3. `<declaring namespace>::name`, if that type exists
//! 4. The first path segment looked up in the declaring type's imports
//! 5. Otherwise the expression is returned unchanged
//!
//! A nullable input yields a `T|null` output.
//!
//! # Caching
//!
//! Import tables and type-existence answers are cached for the lifetime of
//! the expander.

use std::collections::BTreeMap;

use crate::core::type_expr::{
    expand_list_suffix, is_simple_type, normalize, split_generic, split_union, strip_nullable,
    MIXED,
};
use crate::core::types::{TypeName, NAMESPACE_SEPARATOR};
use crate::introspect::{ImportTable, IntrospectionError, TypeIntrospector, TypeKind};

/// Caching type-reference resolver.
#[derive(Debug, Default)]
pub struct TypeExpander {
    imports: BTreeMap<TypeName, ImportTable>,
    kinds: BTreeMap<TypeName, Option<TypeKind>>,
}

impl TypeExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` exists, and as what. Cached.
    pub fn type_kind(
        &mut self,
        introspector: &dyn TypeIntrospector,
        name: &TypeName,
    ) -> Result<Option<TypeKind>, IntrospectionError> {
        if let Some(kind) = self.kinds.get(name) {
            return Ok(*kind);
        }
        let kind = introspector.type_kind(name)?;
        self.kinds.insert(name.clone(), kind);
        Ok(kind)
    }

    pub fn type_exists(
        &mut self,
        introspector: &dyn TypeIntrospector,
        name: &TypeName,
    ) -> Result<bool, IntrospectionError> {
        Ok(self.type_kind(introspector, name)?.is_some())
    }

    fn imports(
        &mut self,
        introspector: &dyn TypeIntrospector,
        declaring: &TypeName,
    ) -> Result<&ImportTable, IntrospectionError> {
        if !self.imports.contains_key(declaring) {
            let table = introspector.imports(declaring)?;
            self.imports.insert(declaring.clone(), table);
        }
        Ok(&self.imports[declaring])
    }

    /// Expand a type expression written in the file declaring `declaring`.
    pub fn expand(
        &mut self,
        introspector: &dyn TypeIntrospector,
        declaring: &TypeName,
        expr: &str,
    ) -> Result<String, IntrospectionError> {
        let (inner, nullable) = strip_nullable(expr);
        let expanded = self.expand_inner(introspector, declaring, &inner)?;
        Ok(if nullable {
            format!("{expanded}|null")
        } else {
            expanded
        })
    }

    fn expand_inner(
        &mut self,
        introspector: &dyn TypeIntrospector,
        declaring: &TypeName,
        expr: &str,
    ) -> Result<String, IntrospectionError> {
        let expr = expand_list_suffix(expr.trim());

        if split_union(&expr).len() > 1 {
            return Ok(expr);
        }

        if let Some((outer, inner)) = split_generic(&expr) {
            let outer = self.expand_inner(introspector, declaring, outer)?;
            let inner = self.expand_inner(introspector, declaring, inner)?;
            return Ok(format!("{outer}<{inner}>"));
        }

        if expr == MIXED || expr.starts_with(NAMESPACE_SEPARATOR) || is_simple_type(&expr) {
            return Ok(normalize(&expr));
        }

        let candidate = match declaring.namespace() {
            Some(namespace) => format!("{namespace}{NAMESPACE_SEPARATOR}{expr}"),
            None => expr.clone(),
        };
        if let Ok(name) = TypeName::new(candidate) {
            if self.type_exists(introspector, &name)? {
                return Ok(name.into());
            }
        }

        let (first, rest) = match expr.split_once(NAMESPACE_SEPARATOR) {
            Some((first, rest)) => (first, Some(rest)),
            None => (expr.as_str(), None),
        };
        if let Some(target) = self.imports(introspector, declaring)?.resolve(first) {
            return Ok(match rest {
                Some(rest) => format!("{target}{NAMESPACE_SEPARATOR}{rest}"),
                None => target.to_string(),
            });
        }

        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PackageKey;
    use crate::introspect::{PackageDef, StaticCatalog, TypeDef};

    fn name(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(vec![PackageDef::new(PackageKey::new("Acme").unwrap())
            .with_type(
                TypeDef::class(name("Acme::Model::Order"))
                    .import("Money", name("Finance::Money"))
                    .import("Geo", name("Vendor::Geo")),
            )
            .with_type(TypeDef::class(name("Acme::Model::Item")))
            .with_type(TypeDef::class(name("Finance::Money")))])
        .unwrap()
    }

    fn expand(expr: &str) -> String {
        TypeExpander::new()
            .expand(&catalog(), &name("Acme::Model::Order"), expr)
            .unwrap()
    }

    #[test]
    fn scalars_and_qualified_names_normalized() {
        assert_eq!(expand("int"), "integer");
        assert_eq!(expand("mixed"), "mixed");
        assert_eq!(expand("::Other::Thing"), "Other::Thing");
    }

    #[test]
    fn same_namespace_resolved() {
        assert_eq!(expand("Item"), "Acme::Model::Item");
    }

    #[test]
    fn import_alias_substituted() {
        assert_eq!(expand("Money"), "Finance::Money");
        assert_eq!(expand("Geo::Point"), "Vendor::Geo::Point");
    }

    #[test]
    fn generics_and_lists_recurse() {
        assert_eq!(expand("array<Item>"), "array<Acme::Model::Item>");
        assert_eq!(expand("Item[]"), "array<Acme::Model::Item>");
    }

    #[test]
    fn nullable_preserved() {
        assert_eq!(expand("?Item"), "Acme::Model::Item|null");
        assert_eq!(expand("Money|null"), "Finance::Money|null");
    }

    #[test]
    fn unresolved_passes_through() {
        assert_eq!(expand("Unknown"), "Unknown");
        assert_eq!(expand("int|string"), "int|string");
    }

    #[test]
    fn type_kind_cached() {
        let catalog = catalog();
        let mut expander = TypeExpander::new();
        assert!(expander.type_exists(&catalog, &name("Finance::Money")).unwrap());
        assert!(!expander.type_exists(&catalog, &name("Nope")).unwrap());
        assert_eq!(expander.kinds.len(), 2);
    }
}
