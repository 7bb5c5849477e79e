//! freeze and unfreeze commands - Manage precompiled package reflection

use crate::cli::Context;
use crate::core::types::PackageKey;
use anyhow::{Context as _, Result};

/// Write the precompiled bundle of a package.
pub fn freeze(ctx: &Context, package: &str) -> Result<()> {
    let key = PackageKey::new(package).context("Invalid package key")?;
    let _lock = ctx.lock()?;
    let mut service = ctx.service()?;

    let count = service
        .freeze_package_reflection(&key)
        .with_context(|| format!("Failed to freeze '{}'", key))?;

    if !ctx.quiet {
        println!("Froze reflection of {} ({} class(es))", key, count);
    }
    Ok(())
}

/// Delete the precompiled bundle of a package.
pub fn unfreeze(ctx: &Context, package: &str) -> Result<()> {
    let key = PackageKey::new(package).context("Invalid package key")?;
    let _lock = ctx.lock()?;
    let mut service = ctx.service()?;

    let removed = service
        .unfreeze_package_reflection(&key)
        .with_context(|| format!("Failed to unfreeze '{}'", key))?;

    if !ctx.quiet {
        if removed {
            println!("Unfroze reflection of {}", key);
        } else {
            println!("Package {} was not frozen", key);
        }
    }
    Ok(())
}
