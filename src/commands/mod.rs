// ABOUTME: Command implementations behind the CLI surface
// ABOUTME: Exports the export, import, and validate commands

pub mod export;
pub mod import;
pub mod validate;

pub use export::export;
pub use import::import;
pub use validate::validate;

use crate::schema::SchemaRegistry;
use anyhow::{Context, Result};
use std::path::Path;

/// Built-in application registry, or an operator-supplied TOML override.
pub(crate) fn load_registry(schema_file: Option<&Path>) -> Result<SchemaRegistry> {
    match schema_file {
        Some(path) => SchemaRegistry::from_toml_file(path)
            .with_context(|| format!("Failed to load schema registry from {}", path.display())),
        None => Ok(SchemaRegistry::application_schema()),
    }
}
