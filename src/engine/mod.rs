// ABOUTME: Generic SQL connection handle with tagged engine-family dispatch
// ABOUTME: Routes vendor-specific pre/post steps to the postgres or sqlite backend

pub mod postgres;
pub mod sqlite;

use crate::coerce::{SqlValue, TypeFamily};
use crate::error::DumpError;
use crate::schema::{SchemaRegistry, TableSpec};
use std::io::Write;
use std::path::Path;

/// Coarse classification of target database behavior, selected once per
/// connection. Families outside the known set get the generic fallback:
/// plain deletes, no pragmas, no sequence repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFamily {
    Postgres,
    Sqlite,
    Generic,
}

impl EngineFamily {
    pub fn label(self) -> &'static str {
        match self {
            EngineFamily::Postgres => "postgres",
            EngineFamily::Sqlite => "sqlite",
            EngineFamily::Generic => "generic",
        }
    }
}

/// One column as probed from a live table.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub family: TypeFamily,
    pub native_type: String,
    pub nullable: bool,
}

/// Quote an identifier with standard SQL double quotes.
///
/// Identifiers come from the hand-curated registry and from probed column
/// metadata, never from archive payloads. Both supported engine families
/// accept the standard quoting style (it also preserves reserved words like
/// `user`).
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident)
}

/// A single open connection to a source or target database.
///
/// All engine access goes through this handle so the export/import/validate
/// logic stays vendor-neutral; the variants carry whatever vendor state the
/// family needs.
pub enum DbHandle {
    Postgres(postgres::PgEngine),
    Sqlite(sqlite::SqliteEngine),
}

impl DbHandle {
    /// Connect from a URL. `postgres://` and `postgresql://` URLs get the
    /// PostgreSQL backend (with TLS and retry); anything else is treated as
    /// a SQLite database path, with an optional `sqlite://` prefix.
    pub async fn connect(url: &str) -> Result<Self, DumpError> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbHandle::Postgres(postgres::connect_with_retry(url).await?))
        } else {
            let path = url.strip_prefix("sqlite://").unwrap_or(url);
            Ok(DbHandle::Sqlite(sqlite::open(Path::new(path))?))
        }
    }

    pub fn family(&self) -> EngineFamily {
        match self {
            DbHandle::Postgres(pg) => pg.family(),
            DbHandle::Sqlite(_) => EngineFamily::Sqlite,
        }
    }

    /// Engine identification recorded in the manifest.
    pub fn engine_name(&self) -> &str {
        match self {
            DbHandle::Postgres(pg) => pg.engine_name(),
            DbHandle::Sqlite(sq) => sq.engine_name(),
        }
    }

    /// Zero-row probe: the table's live column set, in ordinal order.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DumpError> {
        match self {
            DbHandle::Postgres(pg) => pg.table_columns(table).await,
            DbHandle::Sqlite(sq) => sq.table_columns(table),
        }
    }

    /// Stream one table's rows, in `order_by` order, as JSONL into `out`.
    /// Returns the row count. Read-only; never opens a transaction.
    pub async fn write_table_jsonl(
        &self,
        spec: &TableSpec,
        columns: &[ColumnInfo],
        out: &mut dyn Write,
    ) -> Result<u64, DumpError> {
        match self {
            DbHandle::Postgres(pg) => pg.write_table_jsonl(spec, columns, out).await,
            DbHandle::Sqlite(sq) => sq.write_table_jsonl(spec, columns, out),
        }
    }

    pub async fn table_is_empty(&self, table: &str) -> Result<bool, DumpError> {
        match self {
            DbHandle::Postgres(pg) => pg.table_is_empty(table).await,
            DbHandle::Sqlite(sq) => sq.table_is_empty(table),
        }
    }

    /// Vendor session setup that cannot run inside a transaction (SQLite
    /// pragmas). Must be called before `begin`.
    pub async fn pre_import_setup(&self) -> Result<(), DumpError> {
        match self {
            DbHandle::Postgres(_) => Ok(()),
            DbHandle::Sqlite(sq) => sq.apply_import_pragmas(),
        }
    }

    pub async fn begin(&self) -> Result<(), DumpError> {
        self.execute_batch("BEGIN").await
    }

    pub async fn commit(&self) -> Result<(), DumpError> {
        self.execute_batch("COMMIT").await
    }

    pub async fn rollback(&self) -> Result<(), DumpError> {
        self.execute_batch("ROLLBACK").await
    }

    /// Clear all registry tables in deletion order, using the fastest
    /// mechanism the family offers.
    pub async fn truncate_all(&self, registry: &SchemaRegistry) -> Result<(), DumpError> {
        match self {
            DbHandle::Postgres(pg) => pg.truncate_all(registry).await,
            DbHandle::Sqlite(sq) => sq.delete_all(registry),
        }
    }

    /// Insert a batch of decoded rows with one parameterized statement per
    /// round trip (PostgreSQL) or a reused prepared statement (SQLite).
    pub async fn insert_batch(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        rows: &[Vec<SqlValue>],
    ) -> Result<(), DumpError> {
        if rows.is_empty() {
            return Ok(());
        }
        match self {
            DbHandle::Postgres(pg) => pg.insert_batch(table, columns, rows).await,
            DbHandle::Sqlite(sq) => sq.insert_batch(table, columns, rows),
        }
    }

    /// Engine-specific identity/sequence repair so future auto-generated
    /// keys never collide with imported explicit values. Runs inside the
    /// import transaction, after all inserts.
    pub async fn repair_sequences(&self, registry: &SchemaRegistry) -> Result<(), DumpError> {
        match self {
            DbHandle::Postgres(pg) => pg.repair_sequences(registry).await,
            // SQLite assigns max(rowid)+1 natively; nothing to repair.
            DbHandle::Sqlite(_) => Ok(()),
        }
    }

    /// Integrity verification that the family cannot run inside a
    /// transaction (SQLite `foreign_key_check`). Called after commit; a
    /// reported violation is fatal but can no longer be rolled back.
    pub async fn post_commit_verify(&self) -> Result<(), DumpError> {
        match self {
            DbHandle::Postgres(_) => Ok(()),
            DbHandle::Sqlite(sq) => sq.verify_foreign_keys(),
        }
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), DumpError> {
        match self {
            DbHandle::Postgres(pg) => pg.execute_batch(sql).await,
            DbHandle::Sqlite(sq) => sq.execute_batch(sql),
        }
    }
}
