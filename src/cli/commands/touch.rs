//! touch command - Mark classes as changed

use crate::cli::Context;
use crate::core::types::TypeName;
use anyhow::{Context as _, Result};

/// Drop the freshness markers of `classes`.
pub fn touch(ctx: &Context, classes: &[String]) -> Result<()> {
    let names = classes
        .iter()
        .map(|c| TypeName::new(c).with_context(|| format!("Invalid class name '{}'", c)))
        .collect::<Result<Vec<_>>>()?;

    let _lock = ctx.lock()?;
    let service = ctx.service()?;
    service
        .mark_classes_changed(&names)
        .context("Failed to update freshness markers")?;

    if !ctx.quiet {
        println!("Marked {} class(es) as changed", names.len());
    }
    Ok(())
}
