//! build command - Reflect the catalog and persist the caches

use crate::cli::Context;
use crate::reflection::SaveOutcome;
use anyhow::{Context as _, Result};

/// Run a build pass over the catalog and save the caches.
pub fn build(ctx: &Context) -> Result<()> {
    let _lock = ctx.lock()?;
    let mut service = ctx.service()?;

    let state = service.initialize().context("Failed to load reflection caches")?;
    let report = service.build_from_catalog().context("Build pass failed")?;
    let outcome = service.save_to_cache().context("Failed to save reflection caches")?;

    if ctx.quiet {
        return Ok(());
    }

    println!("Cache state: {} ({})", state, ctx.settings.context);
    println!(
        "Reflected {} class(es), forgot {}, built {} schema(ta)",
        report.reflected.len(),
        report.forgotten.len(),
        report.schemata
    );
    match outcome {
        SaveOutcome::Skipped => println!("Caches unchanged"),
        SaveOutcome::Saved(saved) => {
            println!("Saved caches, {} class(es) marked fresh", saved.fresh_classes);
            if saved.runtime_frozen {
                println!("Runtime cache frozen");
            }
            for package in &saved.bundles_written {
                println!("Wrote precompiled reflection for {}", package);
            }
        }
    }

    Ok(())
}
