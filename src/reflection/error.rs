//! reflection::error
//!
//! Error taxonomy of the reflection engine.
//!
//! # Categories
//!
//! - Configuration errors name the offending class, and the property or
//!   method where one is involved. They abort the current build pass.
//! - Integrity guards (`InvalidClass`) flag caller bugs.
//! - API misuse (`NotAnInterface`, `NotAClass`) is reported by queries that
//!   require an existing interface or class.
//! - Cache-layer errors surface at the call site.

use thiserror::Error;

use super::schema::SchemaError;
use crate::cache::CacheError;
use crate::core::types::{PackageKey, TypeError, TypeName};
use crate::introspect::IntrospectionError;

/// Errors from the reflection engine.
#[derive(Debug, Error)]
pub enum ReflectionError {
    #[error("refusing to reflect generated proxy class '{0}'")]
    InvalidClass(TypeName),

    #[error("class '{0}' could not be loaded")]
    ClassLoadingFailed(TypeName),

    #[error("cyclic inheritance detected at '{0}'")]
    CyclicInheritance(TypeName),

    #[error("invalid @var type '{type_expr}' for property '{property}' of '{class}': {reason}")]
    InvalidPropertyType {
        class: TypeName,
        property: String,
        type_expr: String,
        reason: String,
    },

    #[error("value object '{class}' {reason}")]
    InvalidValueObject { class: TypeName, reason: String },

    #[error("class '{class}' has scope '{scope}', but persistable classes must be prototype")]
    InvalidScope { class: TypeName, scope: String },

    #[error("constraint violation in '{class}': {message}")]
    ConstraintViolation { class: TypeName, message: String },

    #[error("aggregate root '{class}' extends '{ancestor}', which has a schema but no repository")]
    AggregateRootInconsistency { class: TypeName, ancestor: TypeName },

    #[error("'{0}' is not an existing interface")]
    NotAnInterface(String),

    #[error("'{0}' is not an existing class")]
    NotAClass(String),

    #[error("unknown package '{0}'")]
    UnknownPackage(PackageKey),

    #[error("the {0} cache is not configured")]
    MissingCache(&'static str),

    #[error("refusing to persist reflection data: the last build pass failed")]
    IncompleteBuild,

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    #[error(transparent)]
    Type(#[from] TypeError),
}
