// ABOUTME: Export command: connect to the source and write a portable archive
// ABOUTME: Read-only against the source database

use crate::engine::DbHandle;
use crate::migration;
use anyhow::{Context, Result};
use std::path::Path;

/// Export the registry's tables from `database_url` into an archive.
///
/// # Arguments
///
/// * `database_url` - `postgresql://…` connection string or SQLite file path
/// * `schema_file` - optional TOML registry override
/// * `archive_path` - destination archive (parent directories are created)
///
/// # Errors
///
/// Fails if the connection cannot be established, a registry table is
/// missing from the source, or the archive cannot be written.
pub async fn export(
    database_url: &str,
    schema_file: Option<&Path>,
    archive_path: &Path,
) -> Result<()> {
    tracing::info!("Starting export...");
    let registry = super::load_registry(schema_file)?;

    tracing::info!("Step 1/2: Connecting to source database...");
    let db = DbHandle::connect(database_url)
        .await
        .context("Failed to connect to source database")?;
    tracing::info!("✓ Connected to {}", db.engine_name());

    tracing::info!("Step 2/2: Exporting {} table(s)...", registry.len());
    let manifest = migration::export_to(&db, &registry, archive_path)
        .await
        .context("Export failed")?;

    let total_rows: u64 = manifest.tables.iter().map(|t| t.row_count).sum();
    tracing::info!(
        "✅ Export complete: {} row(s) across {} table(s) -> {}",
        total_rows,
        manifest.tables.len(),
        archive_path.display()
    );
    Ok(())
}
