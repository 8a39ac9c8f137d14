// ABOUTME: Versioned manifest describing an archive's tables, columns, and ordering
// ABOUTME: Written once per export and validated before any import proceeds

use serde::{Deserialize, Serialize};

/// Structural index of an archive. Produced once by export, read-only after.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format_version: u32,
    pub exported_at_epoch_millis: i64,
    pub source_engine_name: String,
    /// Table entries in insertion order.
    pub tables: Vec<TableManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableManifest {
    pub table: String,
    pub columns: Vec<ColumnManifest>,
    /// Informational; used for logging and assertions, never authoritative
    /// for import.
    pub row_count: u64,
    pub order_by: Vec<String>,
}

/// Describes the *source* column. The importer re-derives the target
/// column's type independently, since source and target engines may differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnManifest {
    pub name: String,
    pub native_type_code: String,
    pub native_type_name: String,
    pub nullable: bool,
}

impl Manifest {
    pub fn table(&self, name: &str) -> Option<&TableManifest> {
        self.tables.iter().find(|t| t.table == name)
    }
}
