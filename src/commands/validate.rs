// ABOUTME: Validate command: structural pre-flight check of an archive
// ABOUTME: Never opens a database connection

use crate::migration;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate an archive and print its manifest summary.
///
/// This is the cheapest possible pre-flight: it only inspects the zip
/// structure and manifest, so it can run anywhere the file is readable.
pub fn validate(archive_path: &Path) -> Result<()> {
    tracing::info!("Validating {}...", archive_path.display());

    let manifest =
        migration::validate_archive(archive_path).context("Archive validation failed")?;

    println!();
    println!("{:<20} {:>10} {:>10}", "Table", "Rows", "Columns");
    println!("{}", "─".repeat(42));
    for table in &manifest.tables {
        println!(
            "{:<20} {:>10} {:>10}",
            table.table,
            table.row_count,
            table.columns.len()
        );
    }
    println!("{}", "─".repeat(42));
    println!(
        "Format v{}, exported from {} at epoch-ms {}",
        manifest.format_version, manifest.source_engine_name, manifest.exported_at_epoch_millis
    );
    println!();

    tracing::info!("✅ Archive is structurally valid");
    Ok(())
}
