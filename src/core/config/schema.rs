//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Config File
//!
//! The same file format is used at global and project scope. Every field is
//! optional; unset fields fall through to the next scope and finally to the
//! built-in defaults.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., interface settings must be valid type names).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::TypeName;

/// Execution mode controlling cache tier behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    /// Caches stay mutable; immutable packages get precompiled bundles.
    #[default]
    Development,
    /// Runtime tiers are written once and frozen.
    Production,
}

impl ExecutionContext {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl FromStr for ExecutionContext {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue(format!(
                "invalid context '{other}', must be one of: development, production"
            ))),
        }
    }
}

/// A configuration file (global or project scope).
///
/// # Example
///
/// ```toml
/// context = "production"
/// ignored_tags = ["api", "author"]
/// log_incorrect_doc_comment_hints = true
/// proxy_namespaces = ["Persistence::Proxies"]
/// repository_interface = "Persistence::RepositoryInterface"
/// object_proxy_interface = "ObjectManagement::ProxyInterface"
/// cache_dir = "/var/cache/classlens"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Execution mode
    pub context: Option<ExecutionContext>,

    /// Doc tags dropped during property reflection
    pub ignored_tags: Option<Vec<String>>,

    /// Log doc-comment/signature mismatches
    pub log_incorrect_doc_comment_hints: Option<bool>,

    /// Name prefixes identifying generated proxies
    pub proxy_namespaces: Option<Vec<String>>,

    /// Interface marking repositories
    pub repository_interface: Option<String>,

    /// Interface implemented by generated object proxies
    pub object_proxy_interface: Option<String>,

    /// Root directory of the file-backed cache tiers
    pub cache_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(prefixes) = &self.proxy_namespaces {
            for prefix in prefixes {
                TypeName::new(prefix.as_str()).map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid proxy namespace: {e}"))
                })?;
            }
        }

        if let Some(iface) = &self.repository_interface {
            TypeName::new(iface.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid repository interface: {e}"))
            })?;
        }

        if let Some(iface) = &self.object_proxy_interface {
            TypeName::new(iface.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid object proxy interface: {e}"))
            })?;
        }

        if let Some(tags) = &self.ignored_tags {
            if tags.iter().any(|t| t.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(
                    "ignored tags cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod execution_context {
        use super::*;

        #[test]
        fn parse() {
            assert_eq!(
                "production".parse::<ExecutionContext>().unwrap(),
                ExecutionContext::Production
            );
            assert_eq!(
                "Dev".parse::<ExecutionContext>().unwrap(),
                ExecutionContext::Development
            );
            assert!("staging".parse::<ExecutionContext>().is_err());
        }

        #[test]
        fn default_is_development() {
            assert_eq!(ExecutionContext::default(), ExecutionContext::Development);
            assert!(!ExecutionContext::default().is_production());
        }
    }

    mod config_file {
        use super::*;

        #[test]
        fn defaults() {
            let config = ConfigFile::default();
            assert!(config.context.is_none());
            assert!(config.ignored_tags.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn roundtrip() {
            let config = ConfigFile {
                context: Some(ExecutionContext::Production),
                ignored_tags: Some(vec!["api".to_string()]),
                log_incorrect_doc_comment_hints: Some(true),
                proxy_namespaces: Some(vec!["Gen::Proxies".to_string()]),
                repository_interface: Some("Store::Repository".to_string()),
                object_proxy_interface: Some("Gen::Proxy".to_string()),
                cache_dir: Some(PathBuf::from("/tmp/cache")),
            };

            let toml = toml::to_string_pretty(&config).unwrap();
            let parsed: ConfigFile = toml::from_str(&toml).unwrap();
            assert_eq!(config, parsed);
        }

        #[test]
        fn reject_unknown_fields() {
            let result: Result<ConfigFile, _> = toml::from_str("unknown_field = true");
            assert!(result.is_err());
        }

        #[test]
        fn invalid_interface_rejected() {
            let config = ConfigFile {
                repository_interface: Some("Store::".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn empty_ignored_tag_rejected() {
            let config = ConfigFile {
                ignored_tags: Some(vec![" ".to_string()]),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }
}
