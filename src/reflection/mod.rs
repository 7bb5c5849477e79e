//! reflection
//!
//! The reflection engine: metadata extraction, persistence schemata and the
//! tiered cache.
//!
//! # Modules
//!
//! - [`attributes`] - Typed attributes and the kind-keyed multi-map
//! - [`descriptor`] - Class, method, parameter and property descriptors
//! - [`data`] - The in-memory index, including forgetting
//! - [`expander`] - Resolution of short type references
//! - [`extractor`] - Builds descriptors from the introspection collaborators
//! - [`schema`] - `ClassSchema` with its mutation invariants
//! - [`schema_builder`] - Batch schema construction and consistency checks
//! - [`tiers`] - Cache tier loading, saving and freezing
//! - [`service`] - The query facade
//! - [`error`] - `ReflectionError`
//!
//! # Flow
//!
//! ```text
//! query / build pass -> Extractor -> SchemaBuilder (per batch)
//!                                          |
//!                  shutdown: CacheTierManager::save
//! ```

pub mod attributes;
pub mod data;
pub mod descriptor;
pub mod error;
pub mod expander;
pub mod extractor;
pub mod schema;
pub mod schema_builder;
pub mod service;
pub mod tiers;

pub use attributes::{Attribute, AttributeError, AttributeKind, AttributeSet};
pub use data::ReflectionData;
pub use descriptor::{
    ClassDescriptor, ClassEntry, MethodDescriptor, ParameterDescriptor, PropertyDescriptor,
};
pub use error::ReflectionError;
pub use schema::{ClassSchema, ModelKind, SchemaError, SchemaProperty};
pub use service::{BuildReport, ReflectionService, ReflectionServiceBuilder};
pub use tiers::{CacheTierManager, CacheTiers, SaveOutcome, SaveReport, TierState};
