//! flush command - Empty every cache tier

use crate::cli::Context;
use crate::reflection::CacheTiers;
use anyhow::{Context as _, Result};

/// Empty and thaw every tier and delete all precompiled bundles.
pub fn flush(ctx: &Context) -> Result<()> {
    let _lock = ctx.lock()?;
    CacheTiers::on_disk(&ctx.paths)
        .flush_all()
        .context("Failed to flush caches")?;

    if !ctx.quiet {
        println!("Flushed caches at {}", ctx.paths.root().display());
    }
    Ok(())
}
