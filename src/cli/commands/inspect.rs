//! show and schema commands - Print reflection data as JSON

use crate::cli::Context;
use crate::core::types::TypeName;
use anyhow::{bail, Context as _, Result};

/// Print the descriptor of a class.
pub fn show(ctx: &Context, class: &str) -> Result<()> {
    let name = TypeName::new(class).context("Invalid class name")?;
    let mut service = ctx.service()?;

    let descriptor = service
        .extract(&name)
        .with_context(|| format!("Failed to reflect '{}'", name))?;
    println!("{}", serde_json::to_string_pretty(descriptor)?);
    Ok(())
}

/// Print the persistence schema of a class.
pub fn schema(ctx: &Context, class: &str) -> Result<()> {
    let name = TypeName::new(class).context("Invalid class name")?;
    let mut service = ctx.service()?;

    service.build_from_catalog().context("Build pass failed")?;
    match service.class_schema(name.as_str())? {
        Some(schema) => println!("{}", serde_json::to_string_pretty(schema)?),
        None => bail!("Class '{}' has no persistence schema", name),
    }
    Ok(())
}
