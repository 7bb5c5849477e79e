//! reflection::schema_builder
//!
//! Builds class schemas for a batch of newly extracted classes and checks
//! cross-class consistency.
//!
//! # Passes
//!
//! 1. One schema per candidate (Entity, ValueObject or Embeddable class)
//! 2. Repository completion from classes implementing the repository
//!    interface
//! 3. Aggregate-root propagation to concrete subclasses
//! 4. Aggregate-root inheritance consistency check
//!
//! Passes 2 to 4 run over all schemata, not just the batch, because a new
//! repository or subclass can change classes built earlier.

use std::collections::BTreeSet;

use tracing::debug;

use super::attributes::{Attribute, AttributeKind};
use super::data::ReflectionData;
use super::descriptor::ClassDescriptor;
use super::error::ReflectionError;
use super::schema::{ClassSchema, ModelKind, SchemaError};
use crate::core::config::ReflectionSettings;
use crate::core::types::TypeName;

/// Name of the synthetic identity property.
pub const SYNTHETIC_IDENTITY_PROPERTY: &str = "persistence_object_identifier";

/// Scope every schema-bearing class must have.
pub const PROTOTYPE_SCOPE: &str = "prototype";

/// Scope every repository must have.
pub const SINGLETON_SCOPE: &str = "singleton";

/// Repository constant naming the managed entity class.
pub const ENTITY_CLASSNAME_CONSTANT: &str = "ENTITY_CLASSNAME";

/// Schema construction over a mutable reflection index.
pub struct SchemaBuilder<'a> {
    data: &'a mut ReflectionData,
    settings: &'a ReflectionSettings,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(data: &'a mut ReflectionData, settings: &'a ReflectionSettings) -> Self {
        Self { data, settings }
    }

    /// Build schemata for `classes` and re-run the cross-class passes.
    /// Returns the number of schemata built.
    pub fn build_schemata(&mut self, classes: &BTreeSet<TypeName>) -> Result<usize, ReflectionError> {
        let mut built = 0;
        for class in classes {
            let Some(descriptor) = self.data.descriptor(class) else {
                continue;
            };
            if !descriptor
                .attributes
                .kinds()
                .any(AttributeKind::is_schema_marker)
            {
                continue;
            }
            check_scope(class, descriptor)?;

            let schema = self.build_class_schema(class, descriptor)?;
            debug!(class = %class, kind = %schema.model_kind(), "built class schema");
            self.data.schemata.insert(class.clone(), schema);
            built += 1;
        }

        self.complete_repository_assignments()?;
        self.propagate_aggregate_roots()?;
        self.ensure_aggregate_root_inheritance_chain_consistency()?;
        Ok(built)
    }

    fn build_class_schema(
        &self,
        class: &TypeName,
        descriptor: &ClassDescriptor,
    ) -> Result<ClassSchema, ReflectionError> {
        let attributes = &descriptor.attributes;
        let mut schema = ClassSchema::new(class.clone());
        add_properties(&mut schema, class, descriptor)?;

        if attributes.contains(&AttributeKind::Embeddable) {
            return Ok(schema);
        }

        if attributes.contains(&AttributeKind::ValueObject) {
            check_value_object_requirements(class, descriptor)?;
            schema.set_model_kind(ModelKind::ValueObject);
            return Ok(schema);
        }

        if attributes.contains(&AttributeKind::Entity) {
            schema.set_model_kind(ModelKind::Entity);
            schema.set_lazy_loadable(attributes.contains(&AttributeKind::Lazy));
        }

        let guess = format!(
            "{}Repository",
            class.as_str().replace("::Model::", "::Repository::")
        );
        if let Ok(repository) = TypeName::new(guess) {
            if self.data.contains(&repository) {
                schema.set_repository_class_name(Some(repository))?;
            }
        }
        Ok(schema)
    }

    fn complete_repository_assignments(&mut self) -> Result<(), ReflectionError> {
        let interface = TypeName::new(self.settings.repository_interface.as_str())?;
        let repositories = self
            .data
            .descriptor(&interface)
            .map(|d| d.interface_implementors.clone())
            .unwrap_or_default();

        for repository in repositories {
            let Some(descriptor) = self.data.descriptor(&repository) else {
                continue;
            };
            if descriptor.is_abstract {
                continue;
            }

            let scope = self.declared_scope(&repository);
            if scope.as_deref() != Some(SINGLETON_SCOPE) {
                return Err(ReflectionError::ConstraintViolation {
                    class: repository,
                    message: format!(
                        "repositories must be of scope singleton, found {}",
                        scope.as_deref().unwrap_or("none")
                    ),
                });
            }

            let Some(entity) = descriptor.constants.get(ENTITY_CLASSNAME_CONSTANT) else {
                continue;
            };
            let Ok(entity) = TypeName::new(entity.trim_matches(|c| c == '\'' || c == '"')) else {
                continue;
            };
            if let Some(schema) = self.data.schemata.get_mut(&entity) {
                schema.set_repository_class_name(Some(repository.clone()))?;
                debug!(entity = %entity, repository = %repository, "bound repository");
            }
        }
        Ok(())
    }

    /// The scope declared on a class or its nearest ancestor declaring one.
    fn declared_scope(&self, class: &TypeName) -> Option<String> {
        std::iter::once(class.clone())
            .chain(self.data.ancestors(class))
            .find_map(|c| match self.data.descriptor(&c)?.attributes.first(&AttributeKind::Scope) {
                Some(Attribute::Scope { value }) => Some(value.clone()),
                _ => None,
            })
    }

    /// Deeper roots go first so a subclass inherits its nearest repository.
    fn propagate_aggregate_roots(&mut self) -> Result<(), ReflectionError> {
        let mut roots: Vec<(usize, TypeName, TypeName)> = self
            .data
            .schemata
            .iter()
            .filter_map(|(class, schema)| {
                let repository = schema.repository_class_name()?.clone();
                Some((self.data.ancestors(class).len(), class.clone(), repository))
            })
            .collect();
        roots.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for (_, root, repository) in roots {
            let subclasses = self
                .data
                .descriptor(&root)
                .map(|d| d.subclasses.clone())
                .unwrap_or_default();

            for subclass in subclasses {
                let is_abstract = self
                    .data
                    .descriptor(&subclass)
                    .map_or(true, |d| d.is_abstract);
                if is_abstract {
                    continue;
                }
                if let Some(schema) = self.data.schemata.get_mut(&subclass) {
                    if !schema.is_aggregate_root() {
                        schema.set_repository_class_name(Some(repository.clone()))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn ensure_aggregate_root_inheritance_chain_consistency(&self) -> Result<(), ReflectionError> {
        for (class, schema) in &self.data.schemata {
            if !schema.is_aggregate_root() {
                continue;
            }
            for ancestor in self.data.ancestors(class) {
                let is_abstract = self
                    .data
                    .descriptor(&ancestor)
                    .map_or(true, |d| d.is_abstract);
                let plain = self
                    .data
                    .schemata
                    .get(&ancestor)
                    .is_some_and(|s| !s.is_aggregate_root());
                if !is_abstract && plain {
                    return Err(ReflectionError::AggregateRootInconsistency {
                        class: class.clone(),
                        ancestor,
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_scope(class: &TypeName, descriptor: &ClassDescriptor) -> Result<(), ReflectionError> {
    if let Some(Attribute::Scope { value }) = descriptor.attributes.first(&AttributeKind::Scope) {
        if value != PROTOTYPE_SCOPE {
            return Err(ReflectionError::InvalidScope {
                class: class.clone(),
                scope: value.clone(),
            });
        }
    }
    Ok(())
}

fn add_properties(
    schema: &mut ClassSchema,
    class: &TypeName,
    descriptor: &ClassDescriptor,
) -> Result<(), ReflectionError> {
    let attributes = &descriptor.attributes;
    let mut skip_identity = attributes.contains(&AttributeKind::Embeddable)
        || attributes
            .get(&AttributeKind::ValueObject)
            .iter()
            .any(|a| matches!(a, Attribute::ValueObject { embedded: true }));

    for (name, property) in &descriptor.properties {
        let marks = &property.attributes;
        if marks.contains(&AttributeKind::Transient)
            || marks.contains(&AttributeKind::Inject)
            || marks.contains(&AttributeKind::InjectConfiguration)
        {
            continue;
        }
        let Some(values) = property.tags.get("var") else {
            continue;
        };
        if values.len() > 1 {
            return Err(ReflectionError::InvalidPropertyType {
                class: class.clone(),
                property: name.clone(),
                type_expr: values.join(", "),
                reason: "more than one @var tag".to_string(),
            });
        }

        let type_expr = values
            .first()
            .and_then(|v| v.split_whitespace().next())
            .unwrap_or("");
        if marks.contains(&AttributeKind::Id) {
            skip_identity = true;
        }

        schema
            .add_property(name, type_expr, marks.contains(&AttributeKind::Lazy), false)
            .map_err(|e| match e {
                SchemaError::InvalidType { source, .. } => ReflectionError::InvalidPropertyType {
                    class: class.clone(),
                    property: name.clone(),
                    type_expr: type_expr.to_string(),
                    reason: source.to_string(),
                },
                other => other.into(),
            })?;

        if marks.contains(&AttributeKind::Identity) {
            schema.mark_as_identity_property(name)?;
        }
    }

    if !skip_identity {
        schema.add_property(SYNTHETIC_IDENTITY_PROPERTY, "string", false, false)?;
    }
    Ok(())
}

fn check_value_object_requirements(
    class: &TypeName,
    descriptor: &ClassDescriptor,
) -> Result<(), ReflectionError> {
    if !descriptor.methods.values().any(|m| m.is_constructor) {
        return Err(ReflectionError::InvalidValueObject {
            class: class.clone(),
            reason: "must have a constructor".to_string(),
        });
    }
    // Naming convention only; a setter under another name goes unnoticed.
    if let Some(setter) = descriptor.methods.keys().find(|m| m.starts_with("set")) {
        return Err(ReflectionError::InvalidValueObject {
            class: class.clone(),
            reason: format!("must not have setter method '{setter}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::attributes::AttributeSet;
    use crate::reflection::descriptor::{ClassEntry, MethodDescriptor, PropertyDescriptor};
    use crate::core::types::Visibility;
    use std::collections::BTreeMap;

    fn name(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    fn property(var: &str, attributes: &[Attribute]) -> PropertyDescriptor {
        PropertyDescriptor {
            visibility: Visibility::Protected,
            declared_type: None,
            tags: BTreeMap::from([("var".to_string(), vec![var.to_string()])]),
            attributes: attributes.iter().cloned().collect(),
            declaring_class: name("Acme::Any"),
        }
    }

    fn method(constructor: bool) -> MethodDescriptor {
        MethodDescriptor {
            is_final: false,
            is_static: false,
            is_constructor: constructor,
            visibility: Visibility::Public,
            attributes: AttributeSet::new(),
            tags: BTreeMap::new(),
            parameters: Vec::new(),
            declared_return_type: None,
            declaring_class: name("Acme::Any"),
        }
    }

    fn insert(data: &mut ReflectionData, class: &str, descriptor: ClassDescriptor) {
        data.classes
            .insert(name(class), ClassEntry::Known(Box::new(descriptor)));
    }

    fn entity(parent: Option<&str>) -> ClassDescriptor {
        ClassDescriptor {
            parent: parent.map(name),
            attributes: [Attribute::Entity].into_iter().collect(),
            properties: BTreeMap::from([("total".to_string(), property("float", &[]))]),
            ..ClassDescriptor::default()
        }
    }

    fn build(data: &mut ReflectionData, classes: &[&str]) -> Result<usize, ReflectionError> {
        let settings = ReflectionSettings::default();
        let batch: BTreeSet<TypeName> = classes.iter().map(|c| name(c)).collect();
        SchemaBuilder::new(data, &settings).build_schemata(&batch)
    }

    mod entity_schema {
        use super::*;

        #[test]
        fn properties_and_synthetic_identity() {
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Order", entity(None));
            assert_eq!(build(&mut data, &["Acme::Order"]).unwrap(), 1);

            let schema = &data.schemata[&name("Acme::Order")];
            assert_eq!(schema.model_kind(), ModelKind::Entity);
            let total = schema.property("total").unwrap();
            assert_eq!(total.type_name, "float");
            assert_eq!(total.element_type, None);
            assert!(!total.lazy);
            assert!(!total.transient);
            assert!(schema.has_property(SYNTHETIC_IDENTITY_PROPERTY));
        }

        #[test]
        fn excluded_and_identity_properties() {
            let mut descriptor = entity(None);
            descriptor.properties.insert(
                "logger".into(),
                property("Acme::Logger", &[Attribute::Inject]),
            );
            descriptor
                .properties
                .insert("sku".into(), property("string", &[Attribute::Identity]));
            descriptor
                .properties
                .insert("id".into(), property("string", &[Attribute::Id]));

            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Order", descriptor);
            build(&mut data, &["Acme::Order"]).unwrap();

            let schema = &data.schemata[&name("Acme::Order")];
            assert!(!schema.has_property("logger"));
            assert!(schema.identity_properties().contains_key("sku"));
            assert!(!schema.has_property(SYNTHETIC_IDENTITY_PROPERTY));
        }

        #[test]
        fn malformed_var_names_class_and_property() {
            let mut descriptor = entity(None);
            descriptor
                .properties
                .insert("broken".into(), property("string<int>", &[]));
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Order", descriptor);

            let err = build(&mut data, &["Acme::Order"]).unwrap_err();
            assert!(matches!(
                err,
                ReflectionError::InvalidPropertyType { ref class, ref property, .. }
                    if class.as_str() == "Acme::Order" && property == "broken"
            ));
        }

        #[test]
        fn multiple_var_tags_rejected() {
            let mut descriptor = entity(None);
            let mut twice = property("float", &[]);
            twice.tags.get_mut("var").unwrap().push("int".into());
            descriptor.properties.insert("total".into(), twice);
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Order", descriptor);

            assert!(matches!(
                build(&mut data, &["Acme::Order"]),
                Err(ReflectionError::InvalidPropertyType { .. })
            ));
        }

        #[test]
        fn non_prototype_scope_rejected() {
            let mut descriptor = entity(None);
            descriptor.attributes.insert(Attribute::Scope {
                value: "singleton".into(),
            });
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Order", descriptor);

            assert!(matches!(
                build(&mut data, &["Acme::Order"]),
                Err(ReflectionError::InvalidScope { .. })
            ));
        }

        #[test]
        fn unmarked_classes_skipped() {
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Helper", ClassDescriptor::default());
            assert_eq!(build(&mut data, &["Acme::Helper"]).unwrap(), 0);
            assert!(data.schemata.is_empty());
        }
    }

    mod value_object {
        use super::*;

        fn money(methods: &[(&str, bool)]) -> ClassDescriptor {
            ClassDescriptor {
                attributes: [Attribute::ValueObject { embedded: false }]
                    .into_iter()
                    .collect(),
                properties: BTreeMap::from([("amount".to_string(), property("float", &[]))]),
                methods: methods
                    .iter()
                    .map(|(n, c)| (n.to_string(), method(*c)))
                    .collect(),
                ..ClassDescriptor::default()
            }
        }

        #[test]
        fn valid_value_object() {
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Money", money(&[("__construct", true)]));
            build(&mut data, &["Acme::Money"]).unwrap();

            let schema = &data.schemata[&name("Acme::Money")];
            assert_eq!(schema.model_kind(), ModelKind::ValueObject);
            assert!(!schema.is_aggregate_root());
            assert!(schema.identity_properties().is_empty());
        }

        #[test]
        fn setter_rejected() {
            let mut data = ReflectionData::new();
            insert(
                &mut data,
                "Acme::Money",
                money(&[("__construct", true), ("setAmount", false)]),
            );
            let err = build(&mut data, &["Acme::Money"]).unwrap_err();
            assert!(matches!(err, ReflectionError::InvalidValueObject { .. }));
            assert!(err.to_string().contains("Acme::Money"));
        }

        #[test]
        fn constructor_required() {
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Money", money(&[]));
            assert!(matches!(
                build(&mut data, &["Acme::Money"]),
                Err(ReflectionError::InvalidValueObject { .. })
            ));
        }
    }

    mod repositories {
        use super::*;

        fn repository(scope: &str, entity: Option<&str>) -> ClassDescriptor {
            let mut descriptor = ClassDescriptor {
                interfaces: BTreeSet::from([name("Persistence::RepositoryInterface")]),
                attributes: [Attribute::Scope {
                    value: scope.into(),
                }]
                .into_iter()
                .collect(),
                ..ClassDescriptor::default()
            };
            if let Some(entity) = entity {
                descriptor
                    .constants
                    .insert(ENTITY_CLASSNAME_CONSTANT.into(), entity.into());
            }
            descriptor
        }

        fn interface(implementors: &[&str]) -> ClassDescriptor {
            ClassDescriptor {
                is_abstract: true,
                is_interface: true,
                interface_implementors: implementors.iter().map(|c| name(c)).collect(),
                ..ClassDescriptor::default()
            }
        }

        #[test]
        fn naming_convention_guess() {
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Model::Order", entity(None));
            insert(
                &mut data,
                "Acme::Repository::OrderRepository",
                ClassDescriptor::default(),
            );
            build(&mut data, &["Acme::Model::Order"]).unwrap();

            assert_eq!(
                data.schemata[&name("Acme::Model::Order")]
                    .repository_class_name()
                    .map(TypeName::as_str),
                Some("Acme::Repository::OrderRepository")
            );
        }

        #[test]
        fn entity_constant_overrides_guess() {
            let mut data = ReflectionData::new();
            insert(&mut data, "Acme::Model::Order", entity(None));
            insert(
                &mut data,
                "Acme::Repository::OrderRepository",
                ClassDescriptor::default(),
            );
            insert(
                &mut data,
                "Acme::Storage::Orders",
                repository("singleton", Some("Acme::Model::Order")),
            );
            insert(
                &mut data,
                "Persistence::RepositoryInterface",
                interface(&["Acme::Storage::Orders"]),
            );
            build(&mut data, &["Acme::Model::Order"]).unwrap();

            assert_eq!(
                data.schemata[&name("Acme::Model::Order")]
                    .repository_class_name()
                    .map(TypeName::as_str),
                Some("Acme::Storage::Orders")
            );
        }

        #[test]
        fn repository_must_be_singleton() {
            let mut data = ReflectionData::new();
            insert(
                &mut data,
                "Acme::Storage::Orders",
                repository("prototype", None),
            );
            insert(
                &mut data,
                "Persistence::RepositoryInterface",
                interface(&["Acme::Storage::Orders"]),
            );

            assert!(matches!(
                build(&mut data, &[]),
                Err(ReflectionError::ConstraintViolation { ref class, .. })
                    if class.as_str() == "Acme::Storage::Orders"
            ));
        }
    }

    mod aggregate_roots {
        use super::*;

        fn with_repository(data: &mut ReflectionData, class: &str) {
            data.schemata
                .get_mut(&name(class))
                .unwrap()
                .set_repository_class_name(Some(name("Acme::Repo")))
                .unwrap();
        }

        fn chain(data: &mut ReflectionData, a_abstract: bool) {
            let mut a = entity(None);
            a.is_abstract = a_abstract;
            a.subclasses = BTreeSet::from([name("B"), name("C")]);
            insert(data, "A", a);
            let mut b = entity(Some("A"));
            b.subclasses = BTreeSet::from([name("C")]);
            insert(data, "B", b);
            insert(data, "C", entity(Some("B")));
        }

        #[test]
        fn repository_propagates_to_subclasses() {
            let mut data = ReflectionData::new();
            chain(&mut data, false);
            build(&mut data, &["A", "B", "C"]).unwrap();
            with_repository(&mut data, "A");
            build(&mut data, &[]).unwrap();

            for class in ["B", "C"] {
                assert_eq!(
                    data.schemata[&name(class)].repository_class_name(),
                    Some(&name("Acme::Repo"))
                );
            }
        }

        #[test]
        fn nearest_repository_wins() {
            let mut data = ReflectionData::new();
            chain(&mut data, false);
            build(&mut data, &["A", "B", "C"]).unwrap();
            with_repository(&mut data, "A");
            data.schemata
                .get_mut(&name("B"))
                .unwrap()
                .set_repository_class_name(Some(name("Acme::BRepo")))
                .unwrap();
            build(&mut data, &[]).unwrap();

            assert_eq!(
                data.schemata[&name("C")].repository_class_name(),
                Some(&name("Acme::BRepo"))
            );
        }

        #[test]
        fn concrete_plain_ancestor_is_inconsistent() {
            let mut data = ReflectionData::new();
            chain(&mut data, false);
            build(&mut data, &["A", "B", "C"]).unwrap();
            with_repository(&mut data, "B");

            let err = build(&mut data, &[]).unwrap_err();
            assert!(matches!(
                err,
                ReflectionError::AggregateRootInconsistency { ref ancestor, .. }
                    if ancestor.as_str() == "A"
            ));
        }

        #[test]
        fn abstract_plain_ancestor_is_fine() {
            let mut data = ReflectionData::new();
            chain(&mut data, true);
            build(&mut data, &["A", "B", "C"]).unwrap();
            with_repository(&mut data, "B");
            build(&mut data, &[]).unwrap();

            assert!(data.schemata[&name("C")].is_aggregate_root());
        }
    }
}
