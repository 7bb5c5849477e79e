//! classlens - Class metadata extraction with tiered reflection caches
//!
//! classlens walks a body of types through an introspection collaborator,
//! records their structure (inheritance, interfaces, methods, properties,
//! attributes and doc tags), derives persistence schemata for entities and
//! value objects, and caches both across process restarts.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the service)
//! - [`reflection`] - Extraction, schema building, cache tiers and the query facade
//! - [`introspect`] - Collaborator contracts and the static catalog
//! - [`cache`] - Blob stores, locking and precompiled bundles
//! - [`core`] - Domain types, doc-tag parsing, configuration and paths
//!
//! # Correctness Invariants
//!
//! 1. A class descriptor is either pending or fully populated
//! 2. Schema invariants are enforced when a schema is mutated
//! 3. A failed build pass is never persisted
//! 4. A frozen runtime cache is never written

pub mod cache;
pub mod cli;
pub mod core;
pub mod introspect;
pub mod reflection;
