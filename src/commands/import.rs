// ABOUTME: Import command: validate the archive, confirm destructive mode, then restore
// ABOUTME: Truncate mode prompts before clearing the target unless --yes is given

use crate::archive::Manifest;
use crate::engine::DbHandle;
use crate::error::DumpError;
use crate::migration::{self, ImportMode};
use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::path::Path;

/// Import an archive into `database_url`.
///
/// Validates the archive before connecting, shows what a truncate import
/// would overwrite and prompts for confirmation (unless `skip_confirmation`
/// is set), then runs the transactional import.
///
/// # Errors
///
/// Fails on any validation, precondition, decode, or constraint error; the
/// target is rolled back and left untouched in every case except a
/// post-commit integrity failure, which is reported as its own category.
pub async fn import(
    database_url: &str,
    schema_file: Option<&Path>,
    archive_path: &Path,
    mode: ImportMode,
    skip_confirmation: bool,
) -> Result<()> {
    tracing::info!("Starting import (mode: {})...", mode);
    let registry = super::load_registry(schema_file)?;

    tracing::info!("Step 1/3: Validating archive structure...");
    let manifest =
        migration::validate_archive(archive_path).context("Archive validation failed")?;
    tracing::info!(
        "✓ Archive is valid (format v{}, source: {}, {} table(s))",
        manifest.format_version,
        manifest.source_engine_name,
        manifest.tables.len()
    );

    if mode == ImportMode::Truncate && !skip_confirmation && !confirm_truncate(&manifest)? {
        bail!("Import cancelled by user");
    }

    tracing::info!("Step 2/3: Connecting to target database...");
    let db = DbHandle::connect(database_url)
        .await
        .context("Failed to connect to target database")?;
    tracing::info!(
        "✓ Connected to {} (family: {})",
        db.engine_name(),
        db.family().label()
    );

    tracing::info!("Step 3/3: Importing {} table(s)...", registry.len());
    match migration::import_from(&db, &registry, archive_path, mode).await {
        Ok(()) => {
            tracing::info!("✅ Import complete: {}", archive_path.display());
            Ok(())
        }
        Err(e @ DumpError::PostCommitIntegrity(_)) => {
            tracing::error!(
                "⚠ Import committed but integrity verification failed; \
                 the target requires manual inspection"
            );
            Err(e.into())
        }
        Err(e) => Err(e).context("Import failed; the target database was rolled back"),
    }
}

/// Show what the truncate import will overwrite and ask to proceed.
fn confirm_truncate(manifest: &Manifest) -> Result<bool> {
    println!();
    println!("{:<20} {:>10}", "Table", "Rows");
    println!("{}", "─".repeat(31));
    for table in &manifest.tables {
        println!("{:<20} {:>10}", table.table, table.row_count);
    }
    println!("{}", "─".repeat(31));
    println!();
    println!("Truncate mode will DELETE all existing rows in these tables first.");
    print!("Proceed with import? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;

    Ok(input.trim().to_lowercase() == "y")
}
