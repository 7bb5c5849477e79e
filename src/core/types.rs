//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`TypeName`] - Validated, fully-qualified type name
//! - [`CacheIdentifier`] - Cache key derived from a type name
//! - [`PackageKey`] - Validated package key
//! - [`Visibility`] - Member visibility
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`Fingerprint`] - Content hash for change detection
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use classlens::core::types::{CacheIdentifier, TypeName};
//!
//! // A leading separator marks a qualified name and is stripped
//! let name = TypeName::new("::Acme::Shop::Model::Order").unwrap();
//! assert_eq!(name.as_str(), "Acme::Shop::Model::Order");
//! assert_eq!(name.namespace(), Some("Acme::Shop::Model"));
//!
//! let id = CacheIdentifier::for_type(&name);
//! assert_eq!(id.as_str(), "Acme_Shop_Model_Order");
//!
//! // Invalid constructions fail at creation time
//! assert!(TypeName::new("").is_err());
//! assert!(TypeName::new("Acme::::Order").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Separator between namespace segments of a type name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid type name: {0}")]
    InvalidTypeName(String),

    #[error("invalid package key: {0}")]
    InvalidPackageKey(String),

    #[error("invalid cache identifier: {0}")]
    InvalidCacheIdentifier(String),
}

/// A validated, fully-qualified type name.
///
/// Type names are `::`-separated segments:
/// - Cannot be empty
/// - A single leading `::` is accepted and stripped
/// - Segments cannot be empty (no `::::` and no trailing `::`)
/// - Segments contain only ASCII alphanumerics and `_`
/// - Segments cannot start with a digit
///
/// # Example
///
/// ```
/// use classlens::core::types::TypeName;
///
/// let name = TypeName::new("Acme::Shop::Order").unwrap();
/// assert_eq!(name.short_name(), "Order");
///
/// assert!(TypeName::new("Acme::").is_err());
/// assert!(TypeName::new("Acme::9Lives").is_err());
/// assert!(TypeName::new("Acme Shop").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Create a new validated type name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTypeName` if the name is malformed.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let cleaned = name
            .strip_prefix(NAMESPACE_SEPARATOR)
            .unwrap_or(&name)
            .to_string();
        Self::validate(&cleaned)?;
        Ok(Self(cleaned))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidTypeName(
                "type name cannot be empty".into(),
            ));
        }

        for segment in name.split(NAMESPACE_SEPARATOR) {
            if segment.is_empty() {
                return Err(TypeError::InvalidTypeName(format!(
                    "'{name}' has an empty namespace segment"
                )));
            }
            if segment.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(TypeError::InvalidTypeName(format!(
                    "segment '{segment}' of '{name}' cannot start with a digit"
                )));
            }
            if let Some(c) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
            {
                return Err(TypeError::InvalidTypeName(format!(
                    "'{name}' cannot contain '{c}'"
                )));
            }
        }

        Ok(())
    }

    /// Get the type name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace part of the name, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.0
            .rfind(NAMESPACE_SEPARATOR)
            .map(|index| &self.0[..index])
    }

    /// The last segment of the name.
    pub fn short_name(&self) -> &str {
        match self.0.rfind(NAMESPACE_SEPARATOR) {
            Some(index) => &self.0[index + NAMESPACE_SEPARATOR.len()..],
            None => &self.0,
        }
    }

    /// Whether this name lives in `namespace` or one of its sub-namespaces.
    pub fn is_in_namespace(&self, namespace: &str) -> bool {
        let namespace = namespace
            .strip_prefix(NAMESPACE_SEPARATOR)
            .unwrap_or(namespace);
        self.0
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with(NAMESPACE_SEPARATOR))
    }
}

impl TryFrom<String> for TypeName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TypeName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A cache key derived from a type name.
///
/// Namespace separators are replaced with underscores so the identifier is
/// safe to use as a blob key and as a file name.
///
/// # Example
///
/// ```
/// use classlens::core::types::{CacheIdentifier, TypeName};
///
/// let name = TypeName::new("Acme::Model::Order").unwrap();
/// assert_eq!(CacheIdentifier::for_type(&name).as_str(), "Acme_Model_Order");
///
/// let reserved = CacheIdentifier::new("__classNames").unwrap();
/// assert_eq!(reserved.as_str(), "__classNames");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheIdentifier(String);

impl CacheIdentifier {
    /// Create a validated identifier.
    ///
    /// Identifiers are non-empty and contain only ASCII alphanumerics,
    /// `_`, `-` and `.`, and cannot start with `.`.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidCacheIdentifier(
                "cache identifier cannot be empty".into(),
            ));
        }
        if id.starts_with('.') {
            return Err(TypeError::InvalidCacheIdentifier(format!(
                "'{id}' cannot start with '.'"
            )));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(TypeError::InvalidCacheIdentifier(format!(
                "'{id}' cannot contain '{c}'"
            )));
        }
        Ok(Self(id))
    }

    /// Derive the identifier for a type name.
    pub fn for_type(name: &TypeName) -> Self {
        Self(name.as_str().replace(NAMESPACE_SEPARATOR, "_"))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CacheIdentifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CacheIdentifier> for String {
    fn from(id: CacheIdentifier) -> Self {
        id.0
    }
}

impl AsRef<str> for CacheIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated package key such as `Acme.Shop`.
///
/// Package keys name a precompiled bundle file, so they are restricted to
/// ASCII alphanumerics, `.`, `_` and `-`, and cannot start with `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageKey(String);

impl PackageKey {
    /// Create a validated package key.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        if key.is_empty() {
            return Err(TypeError::InvalidPackageKey(
                "package key cannot be empty".into(),
            ));
        }
        if key.starts_with('.') {
            return Err(TypeError::InvalidPackageKey(format!(
                "'{key}' cannot start with '.'"
            )));
        }
        if let Some(c) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(TypeError::InvalidPackageKey(format!(
                "'{key}' cannot contain '{c}'"
            )));
        }
        Ok(Self(key))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackageKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageKey> for String {
    fn from(key: PackageKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for PackageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Visibility of a method or property.
///
/// Variants are ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Protected,
    Public,
}

impl Visibility {
    /// Resolve visibility from modifier flags.
    ///
    /// Private wins over protected, protected over public.
    pub fn from_flags(is_private: bool, is_protected: bool) -> Self {
        if is_private {
            Self::Private
        } else if is_protected {
            Self::Protected
        } else {
            Self::Public
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Public
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Public => "public",
        };
        write!(f, "{s}")
    }
}

/// A UTC timestamp that serializes as RFC3339.
///
/// # Example
///
/// ```
/// use classlens::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A stable SHA-256 hash over serialized cache content.
///
/// Used to tell whether the in-memory reflection index changed since it
/// was loaded.
///
/// # Example
///
/// ```
/// use classlens::core::types::Fingerprint;
///
/// let a = Fingerprint::compute(b"{\"classes\":{}}");
/// let b = Fingerprint::compute(b"{\"classes\":{}}");
/// assert_eq!(a, b);
/// assert_ne!(a, Fingerprint::compute(b"{}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint over raw bytes.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
