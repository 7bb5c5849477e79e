//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--catalog <file>`: Type catalog to reflect (default `classlens.json`)
//! - `--cache-dir <dir>`: Root of the file-backed cache tiers
//! - `--context <mode>`: `development` or `production`
//! - `--config <file>`: Explicit config file, skipping discovery
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::ExecutionContext;

/// classlens - Class metadata extraction with tiered reflection caches
#[derive(Parser, Debug)]
#[command(name = "classlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Type catalog to reflect
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Root directory of the cache tiers
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Execution context (development or production)
    #[arg(long, global = true, value_name = "MODE")]
    pub context: Option<ExecutionContext>,

    /// Config file to use instead of the discovered ones
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reflect every catalog class and persist the caches
    #[command(
        name = "build",
        long_about = "Run a build pass over every class in the catalog and persist the caches.\n\n\
            Classes whose freshness marker is missing are forgotten and re-extracted, \
            classes new to the catalog are extracted, and schemata are built for the \
            newly extracted classes. In production context the runtime tiers are \
            written and frozen; later runs read them without extracting anything.",
        after_help = "\
EXAMPLES:
    # Incremental development build
    classlens build

    # Build and freeze the runtime cache
    classlens --context production build"
    )]
    Build,

    /// Print the descriptor of a class as JSON
    Show {
        /// Fully-qualified class name
        class: String,
    },

    /// Print the persistence schema of a class as JSON
    Schema {
        /// Fully-qualified class name
        class: String,
    },

    /// Write the precompiled reflection bundle of a package
    Freeze {
        /// Package key
        package: String,
    },

    /// Delete the precompiled reflection bundle of a package
    Unfreeze {
        /// Package key
        package: String,
    },

    /// Empty every cache tier and delete all precompiled bundles
    Flush,

    /// Mark classes as changed so the next build re-extracts them
    Touch {
        /// Fully-qualified class names
        #[arg(required = true)]
        classes: Vec<String>,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    classlens completion bash > ~/.local/share/bash-completion/completions/classlens

    # Zsh
    classlens completion zsh > ~/.zfunc/_classlens"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_command() {
        let cli = Cli::try_parse_from([
            "classlens",
            "build",
            "--context",
            "production",
            "--cache-dir",
            "/tmp/cache",
        ])
        .unwrap();
        assert_eq!(cli.context, Some(ExecutionContext::Production));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert!(matches!(cli.command, Command::Build));
    }

    #[test]
    fn touch_requires_a_class() {
        assert!(Cli::try_parse_from(["classlens", "touch"]).is_err());
    }

    #[test]
    fn rejects_unknown_context() {
        assert!(Cli::try_parse_from(["classlens", "--context", "staging", "build"]).is_err());
    }
}
