// ABOUTME: Restores an archive into a target database inside one outer transaction
// ABOUTME: Decodes each row by the target column's type; batches inserts; repairs sequences

use crate::archive::{ArchiveReader, Manifest, TableManifest};
use crate::coerce;
use crate::engine::{ColumnInfo, DbHandle};
use crate::error::DumpError;
use crate::migration::validate_archive;
use crate::schema::{SchemaRegistry, TableSpec};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

/// How to treat existing rows in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Abort (with no mutation) if any in-scope table has rows. The safe
    /// default.
    FailIfNotEmpty,
    /// Clear every in-scope table, in deletion order, before inserting.
    Truncate,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::FailIfNotEmpty => write!(f, "fail-if-not-empty"),
            ImportMode::Truncate => write!(f, "truncate"),
        }
    }
}

/// Rows per INSERT round trip, bounded by bind-parameter limits.
const BATCH_ROWS: usize = 500;
const MAX_BIND_PARAMS: usize = 60_000;

fn rows_per_batch(column_count: usize) -> usize {
    BATCH_ROWS.min(MAX_BIND_PARAMS / column_count.max(1)).max(1)
}

/// Import an archive into the target database.
///
/// Sequence: validate the archive (no database contact), apply vendor
/// session setup that cannot run inside a transaction, then one outer
/// transaction covering the emptiness check or truncation, all table
/// inserts in insertion order, and sequence repair. Any failure before
/// commit rolls the whole transaction back, leaving the target untouched.
/// Engines with a deferred integrity check run it after commit; a violation
/// there surfaces as [`DumpError::PostCommitIntegrity`], which can no
/// longer be rolled back.
pub async fn import_from(
    db: &DbHandle,
    registry: &SchemaRegistry,
    path: &Path,
    mode: ImportMode,
) -> Result<(), DumpError> {
    let manifest = validate_archive(path)?;
    tracing::debug!(
        "Importing into {} (family: {}, mode: {})",
        db.engine_name(),
        db.family().label(),
        mode
    );

    db.pre_import_setup().await?;
    db.begin().await?;

    match run_transactional(db, registry, path, &manifest, mode).await {
        Ok(()) => db.commit().await?,
        Err(e) => {
            if let Err(rollback_err) = db.rollback().await {
                tracing::warn!("Rollback after import failure also failed: {}", rollback_err);
            }
            return Err(e);
        }
    }

    db.post_commit_verify().await?;
    Ok(())
}

async fn run_transactional(
    db: &DbHandle,
    registry: &SchemaRegistry,
    path: &Path,
    manifest: &Manifest,
    mode: ImportMode,
) -> Result<(), DumpError> {
    match mode {
        ImportMode::FailIfNotEmpty => {
            for spec in registry.insertion_order() {
                if !db.table_is_empty(&spec.name).await? {
                    return Err(DumpError::TargetNotEmpty {
                        table: spec.name.clone(),
                    });
                }
            }
        }
        ImportMode::Truncate => db.truncate_all(registry).await?,
    }

    let mut archive = ArchiveReader::open(path)?;
    for spec in registry.insertion_order() {
        let table_manifest = manifest.table(&spec.name).ok_or_else(|| {
            DumpError::ArchiveStructure(format!("manifest is missing table \"{}\"", spec.name))
        })?;
        import_table(db, &mut archive, spec, table_manifest).await?;
    }

    db.repair_sequences(registry).await?;
    Ok(())
}

async fn import_table(
    db: &DbHandle,
    archive: &mut ArchiveReader,
    spec: &TableSpec,
    table_manifest: &TableManifest,
) -> Result<(), DumpError> {
    let target_columns = db.table_columns(&spec.name).await?;
    let by_name: HashMap<&str, &ColumnInfo> = target_columns
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();

    // Intersection of manifest and target columns, in manifest order.
    // Source columns absent from the target are skipped silently; that is
    // the forward-compatible schema-evolution path, not an error.
    let insert_columns: Vec<ColumnInfo> = table_manifest
        .columns
        .iter()
        .filter_map(|cm| by_name.get(cm.name.as_str()).map(|c| (*c).clone()))
        .collect();

    if insert_columns.is_empty() {
        tracing::warn!("Skipping table {}; no matching columns", spec.name);
        return Ok(());
    }

    let batch_rows = rows_per_batch(insert_columns.len());
    let reader = archive.table_reader(&spec.name)?;
    let mut batch: Vec<Vec<coerce::SqlValue>> = Vec::with_capacity(batch_rows);
    let mut inserted = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let object: serde_json::Map<String, JsonValue> = serde_json::from_str(&line)?;

        let mut row = Vec::with_capacity(insert_columns.len());
        for col in &insert_columns {
            let raw = object.get(&col.name).unwrap_or(&JsonValue::Null);
            let value =
                coerce::decode(raw, col.family).map_err(|reason| DumpError::Decode {
                    table: spec.name.clone(),
                    column: col.name.clone(),
                    reason,
                })?;
            row.push(value);
        }

        batch.push(row);
        inserted += 1;
        if batch.len() >= batch_rows {
            db.insert_batch(&spec.name, &insert_columns, &batch).await?;
            batch.clear();
        }
    }
    db.insert_batch(&spec.name, &insert_columns, &batch).await?;

    if inserted != table_manifest.row_count {
        tracing::warn!(
            "Table {}: manifest declared {} rows but archive held {}",
            spec.name,
            table_manifest.row_count,
            inserted
        );
    }
    tracing::info!("Imported {} rows into {}", inserted, spec.name);
    Ok(())
}
