//! cli
//!
//! Command-line interface layer for classlens.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve configuration and cache locations into a [`Context`]
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`crate::reflection::ReflectionService`]. All cache mutations flow
//! through the service or the cache tiers, under the root cache lock.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cache::CacheLock;
use crate::core::config::{Config, ReflectionSettings};
use crate::core::paths::CachePaths;
use crate::introspect::StaticCatalog;
use crate::reflection::{CacheTiers, ReflectionService};

/// Catalog file used when `--catalog` is not given.
pub const DEFAULT_CATALOG_FILE: &str = "classlens.json";

/// Resolved execution context for a command.
#[derive(Debug, Clone)]
pub struct Context {
    pub catalog_path: PathBuf,
    pub settings: ReflectionSettings,
    pub paths: CachePaths,
    pub quiet: bool,
}

impl Context {
    /// Resolve configuration with CLI flags taking precedence.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;

        let config = match &cli.config {
            Some(path) => Config::load_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::load(Some(&cwd)).context("Failed to load configuration")?,
        };
        let mut settings = config.settings();
        if let Some(context) = cli.context {
            settings.context = context;
        }
        if let Some(dir) = &cli.cache_dir {
            settings.cache_dir = Some(dir.clone());
        }

        let root = settings
            .cache_dir
            .clone()
            .unwrap_or_else(|| CachePaths::default_root(&cwd));

        Ok(Self {
            catalog_path: cli
                .catalog
                .clone()
                .unwrap_or_else(|| cwd.join(DEFAULT_CATALOG_FILE)),
            settings,
            paths: CachePaths::new(root),
            quiet: cli.quiet,
        })
    }

    /// Build a service over the catalog and the on-disk tiers.
    pub fn service(&self) -> Result<ReflectionService> {
        let catalog = load_catalog(&self.catalog_path)?;
        Ok(ReflectionService::from_catalog(Arc::new(catalog))
            .settings(self.settings.clone())
            .tiers(CacheTiers::on_disk(&self.paths))
            .build())
    }

    /// Take the root cache lock for a mutating command.
    pub fn lock(&self) -> Result<CacheLock> {
        CacheLock::acquire(&self.paths.lock_path())
            .with_context(|| format!("Cache at {} is in use", self.paths.root().display()))
    }
}

fn load_catalog(path: &Path) -> Result<StaticCatalog> {
    StaticCatalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

/// Install the stderr log subscriber.
fn init_tracing(debug: bool, quiet: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    // Ignored when a subscriber is already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);

    if let args::Command::Completion { shell } = cli.command {
        return commands::completion(shell);
    }

    let ctx = Context::from_cli(&cli)?;
    commands::dispatch(cli.command, &ctx)
}
