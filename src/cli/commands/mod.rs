//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Takes the cache lock if it mutates the caches
//! 3. Calls the reflection service or the cache tiers
//! 4. Formats and displays output
//!
//! Read-only commands (`show`, `schema`) never persist anything.

mod build;
mod completion;
mod flush;
mod freeze;
mod inspect;
mod touch;

// Re-export command functions for testing and direct invocation
pub use build::build;
pub use completion::completion;
pub use flush::flush;
pub use freeze::{freeze, unfreeze};
pub use inspect::{schema, show};
pub use touch::touch;

use crate::cli::args::Command;
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Build => build::build(ctx),
        Command::Show { class } => inspect::show(ctx, &class),
        Command::Schema { class } => inspect::schema(ctx, &class),
        Command::Freeze { package } => freeze::freeze(ctx, &package),
        Command::Unfreeze { package } => freeze::unfreeze(ctx, &package),
        Command::Flush => flush::flush(ctx),
        Command::Touch { classes } => touch::touch(ctx, &classes),
        Command::Completion { shell } => completion::completion(shell),
    }
}
