//! core
//!
//! Core domain types and leaf components for classlens.
//!
//! # Modules
//!
//! - [`types`] - Strong types: TypeName, CacheIdentifier, PackageKey, etc.
//! - [`doc_tags`] - Documentation block parsing into description and tags
//! - [`type_expr`] - Type expression normalization and parsing
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for cache storage
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Parsing never panics on malformed input

pub mod config;
pub mod doc_tags;
pub mod paths;
pub mod type_expr;
pub mod types;
