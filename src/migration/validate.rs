// ABOUTME: Structural archive validation: manifest present, version supported, entries complete
// ABOUTME: Never touches a database; the cheapest pre-flight before any destructive import

use crate::archive::{table_entry_name, ArchiveReader, Manifest, FORMAT_VERSION};
use crate::error::DumpError;
use std::path::Path;

/// Validate an archive's structure and return its manifest.
///
/// Checks, in order: the file opens as a zip, `manifest.json` exists and
/// parses, the format version matches the supported constant, and every
/// table listed in the manifest has a matching `tables/<name>.jsonl` entry.
/// Reports the first structural problem found.
///
/// This requires no database connection and must be called before any
/// destructive import step.
pub fn validate_archive(path: &Path) -> Result<Manifest, DumpError> {
    let mut reader = ArchiveReader::open(path)?;
    let manifest = reader.read_manifest()?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(DumpError::UnsupportedFormatVersion {
            found: manifest.format_version,
        });
    }

    for table in &manifest.tables {
        let entry = table_entry_name(&table.table);
        if !reader.has_entry(&entry) {
            return Err(DumpError::ArchiveStructure(format!(
                "missing archive entry: {}",
                entry
            )));
        }
    }

    Ok(manifest)
}
