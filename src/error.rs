// ABOUTME: Error taxonomy for export, import, and validation operations
// ABOUTME: Distinguishes archive-structure, precondition, decode, and post-commit failures

use crate::archive::FORMAT_VERSION;

/// Errors raised by the portability engine.
///
/// Every operation either completes fully or reports exactly one of these;
/// there is no partial-success shape. All variants abort the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// The archive is structurally broken: missing manifest, unreadable
    /// manifest JSON, or a manifest table without a matching zip entry.
    #[error("Archive structure error: {0}")]
    ArchiveStructure(String),

    /// The manifest declares a format version this build does not support.
    /// There is no upgrade path; re-export with a matching version.
    #[error("Unsupported archive format version {found} (supported: {})", FORMAT_VERSION)]
    UnsupportedFormatVersion { found: u32 },

    /// A target table had rows while importing in fail-if-not-empty mode.
    /// Nothing has been modified; safe to retry after clearing the target.
    #[error("Target table \"{table}\" is not empty; use truncate mode to overwrite")]
    TargetNotEmpty { table: String },

    /// A registry table is missing from the target database.
    #[error("Table \"{table}\" does not exist in the target database")]
    TableNotFound { table: String },

    /// A JSON value could not be coerced to the target column's native type.
    /// The surrounding transaction is rolled back.
    #[error("Cannot decode value for {table}.{column}: {reason}")]
    Decode {
        table: String,
        column: String,
        reason: String,
    },

    /// The import committed, but the engine's post-commit integrity check
    /// (e.g. SQLite foreign_key_check) reported a violation. Rollback is no
    /// longer possible; the target requires manual inspection.
    #[error("Import committed but integrity verification failed: {0}")]
    PostCommitIntegrity(String),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid schema registry configuration (duplicate table, empty
    /// ordering key, unreadable TOML file).
    #[error("Schema registry error: {0}")]
    Registry(String),

    #[error("Connection error: {0}")]
    Connection(String),
}
