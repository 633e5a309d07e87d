use anyhow::{Context, bail};
use refl_schema::SchemaRegistry;
use serde_json::Value;

use crate::cli::{GlobalFlags, SchemaArgs};
use crate::output::output;

/// Handle `reflasm schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let registry = SchemaRegistry::new().context("failed to build schema registry")?;
    let value = lookup(&registry, args.name.as_deref())?;
    output(&value, flags.format)
}

fn lookup(registry: &SchemaRegistry, name: Option<&str>) -> anyhow::Result<Value> {
    let Some(name) = name else {
        return Ok(serde_json::to_value(registry.list())?);
    };
    match registry.get(name) {
        Some(schema) => Ok(schema.clone()),
        None => bail!("unknown schema '{name}' (available: {})", registry.list().join(", ")),
    }
}
