//! introspect
//!
//! Sources of raw type facts.
//!
//! # Modules
//!
//! - [`traits`] - Collaborator contracts the reflection engine consumes
//! - [`catalog`] - Declarative catalog implementing every contract

pub mod catalog;
pub mod traits;

pub use catalog::{CatalogFile, MethodDef, PackageDef, ParameterDef, PropertyDef, StaticCatalog, TypeDef};
pub use traits::{
    AttributeReader, ImportTable, IntrospectionError, ModuleCatalog, PackageInfo, RawMethod,
    RawParameter, RawProperty, RawType, TypeIntrospector, TypeKind,
};
