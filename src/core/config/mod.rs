//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! classlens has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Per-project overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$CLASSLENS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/classlens/config.toml`
//! 3. `~/.classlens/config.toml`
//!
//! # Project Config Location
//!
//! `<project>/.classlens/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use classlens::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let settings = config.settings();
//! println!("Context: {}", settings.context);
//! ```

pub mod schema;

pub use schema::{ConfigFile, ExecutionContext};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Tags that carry no reflection meaning and are dropped by default.
pub const DEFAULT_IGNORED_TAGS: &[&str] = &[
    "api",
    "author",
    "copyright",
    "license",
    "package",
    "see",
    "since",
    "subpackage",
    "todo",
    "fixme",
];

/// Default name prefix of generated proxy types.
pub const DEFAULT_PROXY_NAMESPACE: &str = "Persistence::Proxies";

/// Default repository capability interface.
pub const DEFAULT_REPOSITORY_INTERFACE: &str = "Persistence::RepositoryInterface";

/// Default interface implemented by generated object proxies.
pub const DEFAULT_OBJECT_PROXY_INTERFACE: &str = "ObjectManagement::ProxyInterface";

/// Fully resolved settings consumed by the reflection engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionSettings {
    pub context: ExecutionContext,
    pub ignored_tags: BTreeSet<String>,
    pub log_incorrect_doc_comment_hints: bool,
    pub proxy_namespaces: Vec<String>,
    pub repository_interface: String,
    pub object_proxy_interface: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for ReflectionSettings {
    fn default() -> Self {
        Self {
            context: ExecutionContext::default(),
            ignored_tags: DEFAULT_IGNORED_TAGS.iter().map(|t| t.to_string()).collect(),
            log_incorrect_doc_comment_hints: false,
            proxy_namespaces: vec![DEFAULT_PROXY_NAMESPACE.to_string()],
            repository_interface: DEFAULT_REPOSITORY_INTERFACE.to_string(),
            object_proxy_interface: DEFAULT_OBJECT_PROXY_INTERFACE.to_string(),
            cache_dir: None,
        }
    }
}

impl ReflectionSettings {
    /// Apply a config file on top of these settings.
    pub fn apply(mut self, file: &ConfigFile) -> Self {
        if let Some(context) = file.context {
            self.context = context;
        }
        if let Some(tags) = &file.ignored_tags {
            self.ignored_tags = tags.iter().map(|t| t.to_lowercase()).collect();
        }
        if let Some(log) = file.log_incorrect_doc_comment_hints {
            self.log_incorrect_doc_comment_hints = log;
        }
        if let Some(prefixes) = &file.proxy_namespaces {
            self.proxy_namespaces = prefixes.clone();
        }
        if let Some(iface) = &file.repository_interface {
            self.repository_interface = iface.clone();
        }
        if let Some(iface) = &file.object_proxy_interface {
            self.object_proxy_interface = iface.clone();
        }
        if let Some(dir) = &file.cache_dir {
            self.cache_dir = Some(dir.clone());
        }
        self
    }

    /// Whether a tag is dropped during property reflection.
    pub fn is_ignored_tag(&self, tag: &str) -> bool {
        self.ignored_tags.contains(tag)
    }

    /// Whether a type name denotes a generated proxy.
    pub fn is_proxy_name(&self, name: &str) -> bool {
        let name = name.strip_prefix("::").unwrap_or(name);
        self.proxy_namespaces.iter().any(|prefix| {
            name.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with("::"))
        })
    }
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: ConfigFile,
    /// Project configuration (if found)
    pub project: Option<ConfigFile>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file (if loaded)
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_root` is provided, also loads the project config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(project_root: Option<&Path>) -> Result<Config, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        let (project, project_path) = match project_root {
            Some(root) => {
                let path = Self::project_config_path(root);
                if path.exists() {
                    (Some(Self::read_config(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(Config {
            global,
            project,
            global_path,
            project_path,
        })
    }

    /// Load configuration from an explicit file, skipping discovery.
    pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
        let global = Self::read_config(path)?;
        global.validate()?;
        Ok(Config {
            global,
            project: None,
            global_path: Some(path.to_path_buf()),
            project_path: None,
        })
    }

    fn load_global() -> Result<(ConfigFile, Option<PathBuf>), ConfigError> {
        // 1. Check $CLASSLENS_CONFIG
        if let Ok(path) = std::env::var("CLASSLENS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/classlens/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("classlens/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.classlens/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".classlens/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((ConfigFile::default(), None))
    }

    fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for project config.
    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(".classlens/config.toml")
    }

    /// Resolve settings with precedence applied.
    pub fn settings(&self) -> ReflectionSettings {
        let settings = ReflectionSettings::default().apply(&self.global);
        match &self.project {
            Some(project) => settings.apply(project),
            None => settings,
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
