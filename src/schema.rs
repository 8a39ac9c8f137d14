// ABOUTME: Static schema registry declaring which tables travel in an archive
// ABOUTME: Fixes insertion order (parents first) and derives deletion order as its reverse

use crate::error::DumpError;
use serde::Deserialize;
use std::path::Path;

/// One table's identity for export ordering.
///
/// `order_by` is a non-empty list of column names used as an ORDER BY clause
/// so that row order is deterministic and archives are diff-friendly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub order_by: Vec<String>,
}

impl TableSpec {
    pub fn new(name: &str, order_by: &[&str]) -> Self {
        TableSpec {
            name: name.to_string(),
            order_by: order_by.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Ordered list of tables included in the portable format.
///
/// The list is hand-curated, never computed at runtime: every table reachable
/// via a foreign key from table T appears before T. Keeping it explicit also
/// prevents internal or administrative tables from leaking into archives.
/// Safe for concurrent read-only use; it is loaded once and never mutated.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    tables: Vec<TableSpec>,
}

#[derive(Deserialize)]
struct RegistryFile {
    tables: Vec<RegistryEntry>,
}

#[derive(Deserialize)]
struct RegistryEntry {
    name: String,
    order_by: Vec<String>,
}

impl SchemaRegistry {
    /// Build a registry from an explicit table list.
    ///
    /// # Errors
    ///
    /// Fails if the list is empty, a table name repeats, or any table has an
    /// empty ordering key.
    pub fn new(tables: Vec<TableSpec>) -> Result<Self, DumpError> {
        if tables.is_empty() {
            return Err(DumpError::Registry("table list is empty".to_string()));
        }
        for (i, spec) in tables.iter().enumerate() {
            if spec.order_by.is_empty() {
                return Err(DumpError::Registry(format!(
                    "table \"{}\" has no ordering columns",
                    spec.name
                )));
            }
            if tables[..i].iter().any(|t| t.name == spec.name) {
                return Err(DumpError::Registry(format!(
                    "duplicate table \"{}\"",
                    spec.name
                )));
            }
        }
        Ok(SchemaRegistry { tables })
    }

    /// The application's fixed schema, parents before children.
    pub fn application_schema() -> Self {
        // Explicit scope so internal/administrative tables never travel.
        SchemaRegistry {
            tables: vec![
                TableSpec::new("theme", &["id"]),
                TableSpec::new("user", &["id"]),
                TableSpec::new("deck", &["id"]),
                TableSpec::new("tag", &["id"]),
                TableSpec::new("deck_tag", &["deck_id", "tag_id"]),
                TableSpec::new("card", &["id"]),
                TableSpec::new("card_tag", &["card_id", "tag_id"]),
                TableSpec::new("user_card_srs", &["id"]),
                TableSpec::new("ai_chat", &["id"]),
            ],
        }
    }

    /// Load a registry from a TOML file:
    ///
    /// ```toml
    /// [[tables]]
    /// name = "theme"
    /// order_by = ["id"]
    /// ```
    pub fn from_toml_file(path: &Path) -> Result<Self, DumpError> {
        let raw = std::fs::read_to_string(path)?;
        let file: RegistryFile = toml::from_str(&raw)
            .map_err(|e| DumpError::Registry(format!("{}: {}", path.display(), e)))?;
        Self::new(
            file.tables
                .into_iter()
                .map(|t| TableSpec {
                    name: t.name,
                    order_by: t.order_by,
                })
                .collect(),
        )
    }

    /// Tables in safe insertion order (foreign-key parents first).
    pub fn insertion_order(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Tables in deletion/truncation order: the exact reverse of insertion.
    pub fn deletion_order(&self) -> Vec<&TableSpec> {
        self.tables.iter().rev().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
