//! Integration tests for the reflection engine.
//!
//! These tests drive the public `ReflectionService` over a static catalog
//! and check extraction, forgetting and schema building end to end.

use std::sync::Arc;

use classlens::cache::{BlobStore, MemoryBlobStore};
use classlens::core::types::{PackageKey, TypeName};
use classlens::introspect::{MethodDef, PackageDef, PropertyDef, StaticCatalog, TypeDef};
use classlens::reflection::schema_builder::SYNTHETIC_IDENTITY_PROPERTY;
use classlens::reflection::tiers::REFLECTION_DATA_KEY;
use classlens::reflection::{
    Attribute, CacheTiers, ModelKind, ReflectionError, ReflectionService, SaveOutcome,
};

// =============================================================================
// Test Fixtures
// =============================================================================

fn name(s: &str) -> TypeName {
    TypeName::new(s).unwrap()
}

fn var(property: &str, expr: &str) -> PropertyDef {
    PropertyDef::new(property).doc(format!("/** @var {expr} */"))
}

fn package(types: Vec<TypeDef>) -> StaticCatalog {
    let package = types
        .into_iter()
        .fold(PackageDef::new(PackageKey::new("Shop").unwrap()), PackageDef::with_type);
    StaticCatalog::new(vec![package]).unwrap()
}

fn shop() -> StaticCatalog {
    package(vec![
        TypeDef::interface(name("Persistence::RepositoryInterface")),
        TypeDef::interface(name("Shop::Priced")),
        TypeDef::class(name("Shop::Model::Order"))
            .attribute(Attribute::Entity)
            .implements(name("Shop::Priced"))
            .property(var("total", "float")),
        TypeDef::class(name("Shop::Model::Money"))
            .attribute(Attribute::ValueObject { embedded: false })
            .property(var("amount", "float"))
            .method(MethodDef::constructor()),
        TypeDef::class(name("Shop::Model::AbstractItem"))
            .abstract_()
            .implements(name("Shop::Priced")),
        TypeDef::class(name("Shop::Model::Product"))
            .attribute(Attribute::Entity)
            .property(var("title", "string")),
        TypeDef::class(name("Shop::Model::Book"))
            .extends(name("Shop::Model::Product"))
            .attribute(Attribute::Entity)
            .property(var("isbn", "string")),
        TypeDef::class(name("Shop::Repository::ProductRepository")),
        TypeDef::class(name("Shop::Model::Entry")).attribute(Attribute::Entity),
        TypeDef::class(name("Shop::Repository::Ledger"))
            .implements(name("Persistence::RepositoryInterface"))
            .attribute(Attribute::Scope {
                value: "singleton".into(),
            })
            .constant("ENTITY_CLASSNAME", "'Shop::Model::Entry'"),
    ])
}

fn service(catalog: StaticCatalog) -> ReflectionService {
    ReflectionService::from_catalog(Arc::new(catalog)).build()
}

fn built_shop() -> ReflectionService {
    let mut service = service(shop());
    service.build_from_catalog().expect("build pass");
    service
}

// =============================================================================
// Extraction
// =============================================================================

mod extraction {
    use super::*;

    #[test]
    fn parents_and_implementors_are_registered() {
        let mut service = built_shop();

        assert_eq!(
            service.all_subclasses_for_class("Shop::Model::Product").unwrap(),
            vec![name("Shop::Model::Book")]
        );
        let implementors = service
            .all_implementations_for_interface("Shop::Priced")
            .unwrap();
        assert!(implementors.contains(&name("Shop::Model::Order")));
        assert!(!implementors.contains(&name("Shop::Model::AbstractItem")));
    }

    #[test]
    fn extraction_is_idempotent() {
        let mut service = service(shop());
        let first = service.extract(&name("Shop::Model::Book")).unwrap().clone();
        let second = service.extract(&name("Shop::Model::Book")).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn forgetting_cascades_and_repeats_quietly() {
        let mut service = built_shop();

        let forgotten = service.forget_class(&name("Shop::Model::Product")).unwrap();
        assert_eq!(
            forgotten,
            vec![name("Shop::Model::Product"), name("Shop::Model::Book")]
        );
        assert!(!service.is_class_reflected("Shop::Model::Book").unwrap());
        assert!(service
            .data()
            .schemata
            .get(&name("Shop::Model::Book"))
            .is_none());

        assert!(service
            .forget_class(&name("Shop::Model::Book"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn proxies_are_refused() {
        let catalog = package(vec![TypeDef::class(name("Persistence::Proxies::OrderProxy"))]);
        let mut service = service(catalog);
        assert!(matches!(
            service.extract(&name("Persistence::Proxies::OrderProxy")),
            Err(ReflectionError::InvalidClass(_))
        ));
    }
}

// =============================================================================
// Schemata
// =============================================================================

mod schemata {
    use super::*;

    #[test]
    fn entity_with_float_property() {
        let mut service = built_shop();
        let schema = service
            .class_schema("Shop::Model::Order")
            .unwrap()
            .expect("schema");

        let total = schema.property("total").unwrap();
        assert_eq!(total.type_name, "float");
        assert_eq!(total.element_type, None);
        assert!(!total.lazy);
        assert!(!total.transient);
        assert!(schema.has_property(SYNTHETIC_IDENTITY_PROPERTY));
    }

    #[test]
    fn value_object_without_identity() {
        let mut service = built_shop();
        let schema = service
            .class_schema("Shop::Model::Money")
            .unwrap()
            .expect("schema");

        assert_eq!(schema.model_kind(), ModelKind::ValueObject);
        assert!(!schema.is_aggregate_root());
        assert!(schema.identity_properties().is_empty());
    }

    #[test]
    fn value_object_setter_is_fatal() {
        let catalog = package(vec![TypeDef::class(name("Shop::Model::Money"))
            .attribute(Attribute::ValueObject { embedded: false })
            .method(MethodDef::constructor())
            .method(MethodDef::new("setAmount"))]);
        let mut service = service(catalog);

        match service.build_from_catalog() {
            Err(ReflectionError::InvalidValueObject { class, .. }) => {
                assert_eq!(class, name("Shop::Model::Money"));
            }
            other => panic!("expected a value object error, got {other:?}"),
        }
        assert!(service.is_poisoned());
    }

    #[test]
    fn aggregate_root_propagates_to_subclass() {
        let mut service = built_shop();
        let product = service
            .class_schema("Shop::Model::Product")
            .unwrap()
            .expect("schema")
            .repository_class_name()
            .cloned();
        assert_eq!(product, Some(name("Shop::Repository::ProductRepository")));

        let book = service
            .class_schema("Shop::Model::Book")
            .unwrap()
            .expect("schema")
            .repository_class_name()
            .cloned();
        assert_eq!(book, product);
    }

    #[test]
    fn repository_declares_its_entity() {
        let mut service = built_shop();
        let entry = service
            .class_schema("Shop::Model::Entry")
            .unwrap()
            .expect("schema");
        assert_eq!(
            entry.repository_class_name(),
            Some(&name("Shop::Repository::Ledger"))
        );
    }

    #[test]
    fn repository_must_be_singleton() {
        let catalog = package(vec![
            TypeDef::interface(name("Persistence::RepositoryInterface")),
            TypeDef::class(name("Shop::Repository::Ledger"))
                .implements(name("Persistence::RepositoryInterface")),
        ]);
        let mut service = service(catalog);
        assert!(matches!(
            service.build_from_catalog(),
            Err(ReflectionError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn entity_scope_must_be_prototype() {
        let catalog = package(vec![TypeDef::class(name("Shop::Model::Order"))
            .attribute(Attribute::Entity)
            .attribute(Attribute::Scope {
                value: "singleton".into(),
            })]);
        let mut service = service(catalog);
        assert!(matches!(
            service.build_from_catalog(),
            Err(ReflectionError::InvalidScope { .. })
        ));
    }

    #[test]
    fn concrete_plain_ancestor_of_aggregate_root_is_fatal() {
        let catalog = package(vec![
            TypeDef::class(name("Shop::Model::Base")).attribute(Attribute::Entity),
            TypeDef::class(name("Shop::Model::Child"))
                .extends(name("Shop::Model::Base"))
                .attribute(Attribute::Entity),
            TypeDef::class(name("Shop::Repository::ChildRepository")),
        ]);
        let mut service = service(catalog);
        assert!(matches!(
            service.build_from_catalog(),
            Err(ReflectionError::AggregateRootInconsistency { .. })
        ));
    }

    #[test]
    fn malformed_var_names_class_and_property() {
        let catalog = package(vec![TypeDef::class(name("Shop::Model::Order"))
            .attribute(Attribute::Entity)
            .property(var("lines", "array<"))]);
        let mut service = service(catalog);

        match service.build_from_catalog() {
            Err(ReflectionError::InvalidPropertyType { class, property, .. }) => {
                assert_eq!(class, name("Shop::Model::Order"));
                assert_eq!(property, "lines");
            }
            other => panic!("expected a property type error, got {other:?}"),
        }
    }
}

// =============================================================================
// Determinism
// =============================================================================

mod determinism {
    use super::*;

    fn snapshot_after_build() -> String {
        let compiletime = MemoryBlobStore::named("compiletime");
        let mut tiers = CacheTiers::in_memory();
        tiers.compiletime = Some(Box::new(compiletime.clone()));

        let mut service = ReflectionService::from_catalog(Arc::new(shop()))
            .tiers(tiers)
            .build();
        service.build_from_catalog().unwrap();
        assert!(matches!(
            service.save_to_cache().unwrap(),
            SaveOutcome::Saved(_)
        ));
        compiletime
            .get(REFLECTION_DATA_KEY)
            .unwrap()
            .expect("snapshot")
    }

    #[test]
    fn identical_input_gives_identical_snapshots() {
        assert_eq!(snapshot_after_build(), snapshot_after_build());
    }

    #[test]
    fn second_pass_reflects_nothing() {
        let mut service = built_shop();
        let before = service.data().to_json().unwrap();

        let report = service.build_from_catalog().unwrap();
        assert!(report.reflected.is_empty());
        assert!(report.forgotten.is_empty());
        assert_eq!(service.data().to_json().unwrap(), before);
    }
}
