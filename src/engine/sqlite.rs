// ABOUTME: SQLite backend: file-based connection, pragma setup, probing, inserts
// ABOUTME: Carries the sqlite-family vendor steps (import pragmas, post-commit FK check)

use crate::coerce::{self, SqlValue, TypeFamily};
use crate::engine::{quote_ident as q, ColumnInfo};
use crate::error::DumpError;
use crate::schema::{SchemaRegistry, TableSpec};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, ToSql};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::Path;

/// An open SQLite database file.
pub struct SqliteEngine {
    conn: Connection,
    engine_name: String,
}

pub fn open(path: &Path) -> Result<SqliteEngine, DumpError> {
    let conn = Connection::open(path)?;
    let engine_name = format!("SQLite {}", rusqlite::version());
    tracing::debug!("Opened {} ({})", path.display(), engine_name);
    Ok(SqliteEngine { conn, engine_name })
}

impl SqliteEngine {
    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn execute_batch(&self, sql: &str) -> Result<(), DumpError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DumpError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, \"notnull\" FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let decl: String = row.get(1)?;
                let notnull: i64 = row.get(2)?;
                Ok(ColumnInfo {
                    family: family_of_decl(&decl),
                    native_type: decl,
                    nullable: notnull == 0,
                    name,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(DumpError::TableNotFound {
                table: table.to_string(),
            });
        }
        Ok(columns)
    }

    pub fn write_table_jsonl(
        &self,
        spec: &TableSpec,
        columns: &[ColumnInfo],
        out: &mut dyn Write,
    ) -> Result<u64, DumpError> {
        let list: Vec<String> = columns.iter().map(|c| q(&c.name)).collect();
        let order: Vec<String> = spec.order_by.iter().map(|c| q(c)).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            list.join(", "),
            q(&spec.name),
            order.join(", ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut count = 0u64;

        while let Some(row) = rows.next()? {
            let mut object = serde_json::Map::with_capacity(columns.len());
            for (i, col) in columns.iter().enumerate() {
                object.insert(col.name.clone(), value_ref_json(row.get_ref(i)?));
            }
            serde_json::to_writer(&mut *out, &JsonValue::Object(object))?;
            out.write_all(b"\n")?;
            count += 1;
        }
        Ok(count)
    }

    pub fn table_is_empty(&self, table: &str) -> Result<bool, DumpError> {
        let sql = format!("SELECT 1 FROM {} LIMIT 1", q(table));
        let mut stmt = self.conn.prepare(&sql)?;
        Ok(!stmt.exists([])?)
    }

    /// Session tuning for bulk import. Pragma changes like these cannot run
    /// inside a transaction, so this must precede BEGIN.
    pub fn apply_import_pragmas(&self) -> Result<(), DumpError> {
        self.conn.pragma_update(None, "foreign_keys", "OFF")?;
        self.conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(())
    }

    /// No native fast-truncate: plain deletes in deletion order, with
    /// foreign-key enforcement already off for the session.
    pub fn delete_all(&self, registry: &SchemaRegistry) -> Result<(), DumpError> {
        for spec in registry.deletion_order() {
            let sql = format!("DELETE FROM {}", q(&spec.name));
            self.conn.execute(&sql, [])?;
        }
        Ok(())
    }

    pub fn insert_batch(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        rows: &[Vec<SqlValue>],
    ) -> Result<(), DumpError> {
        let cols: Vec<String> = columns.iter().map(|c| q(&c.name)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            q(table),
            cols.join(", "),
            placeholders.join(", ")
        );

        let mut stmt = self.conn.prepare_cached(&sql)?;
        for row in rows {
            stmt.execute(rusqlite::params_from_iter(row.iter()))?;
        }
        Ok(())
    }

    /// Re-enable foreign keys and run the deferred integrity check. Must run
    /// outside any transaction, after commit.
    pub fn verify_foreign_keys(&self) -> Result<(), DumpError> {
        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        let mut stmt = self.conn.prepare("PRAGMA foreign_key_check")?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            let table: String = row.get(0)?;
            let rowid: Option<i64> = row.get(1)?;
            let parent: String = row.get(2)?;
            return Err(DumpError::PostCommitIntegrity(format!(
                "foreign_key_check failed; first violation: table={} rowid={} parent={}",
                table,
                rowid.map_or("?".to_string(), |r| r.to_string()),
                parent
            )));
        }
        Ok(())
    }
}

fn family_of_decl(decl: &str) -> TypeFamily {
    let t = decl.trim().to_uppercase();
    if t.is_empty() {
        TypeFamily::Other
    } else if t.contains("BOOL") {
        TypeFamily::Boolean
    } else if t.contains("INT") {
        TypeFamily::Integer
    } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
        TypeFamily::Text
    } else if t.contains("BLOB") {
        TypeFamily::Bytes
    } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
        TypeFamily::Float
    } else if t.contains("DEC") || t.contains("NUMERIC") {
        TypeFamily::Decimal
    } else if t.contains("TIMESTAMP") || t.contains("DATETIME") {
        TypeFamily::Timestamp
    } else if t.contains("DATE") {
        TypeFamily::Date
    } else if t.contains("TIME") {
        TypeFamily::Time
    } else {
        TypeFamily::Other
    }
}

/// SQLite stores whatever the writer supplied; values pass through in their
/// stored shape and the decode side coerces by target family.
fn value_ref_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::Number(i.into()),
        ValueRef::Real(f) => coerce::encode_f64(f),
        ValueRef::Text(t) => JsonValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => coerce::encode_bytes(b),
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            // Text with numeric affinity converts losslessly server-side.
            SqlValue::Decimal(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            SqlValue::Timestamp(dt) => {
                ToSqlOutput::Owned(Value::Text(coerce::format_naive_datetime(dt)))
            }
            SqlValue::TimestampTz(dt) => {
                ToSqlOutput::Owned(Value::Text(coerce::format_datetime_utc(dt)))
            }
            SqlValue::Date(d) => ToSqlOutput::Owned(Value::Text(coerce::format_date(d))),
            SqlValue::Time(t) => ToSqlOutput::Owned(Value::Text(coerce::format_time(t))),
        })
    }
}
