// ABOUTME: End-to-end round-trip tests against real SQLite databases
// ABOUTME: Exercises export, truncate/fail-if-not-empty import, rollback, and determinism

use portable_dump::archive::{
    ArchiveWriter, ColumnManifest, Manifest, TableManifest, FORMAT_VERSION,
};
use portable_dump::engine::DbHandle;
use portable_dump::error::DumpError;
use portable_dump::migration::{export_to, import_from, validate_archive, ImportMode};
use portable_dump::schema::SchemaRegistry;
use rusqlite::Connection;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const SCHEMA_DDL: &str = r#"
CREATE TABLE theme (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    cssUrl TEXT,
    active BOOLEAN
);
CREATE TABLE "user" (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name TEXT NOT NULL,
    is_admin BOOLEAN NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    profile_pic_url TEXT NOT NULL,
    theme_id INTEGER REFERENCES theme(id)
);
CREATE TABLE deck (
    id INTEGER PRIMARY KEY,
    name TEXT,
    description TEXT,
    user_id INTEGER NOT NULL REFERENCES "user"(id)
);
CREATE TABLE tag (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE
);
CREATE TABLE deck_tag (
    deck_id INTEGER NOT NULL REFERENCES deck(id),
    tag_id INTEGER NOT NULL REFERENCES tag(id),
    PRIMARY KEY (deck_id, tag_id)
);
CREATE TABLE card (
    id INTEGER PRIMARY KEY,
    front TEXT,
    back TEXT,
    deck_id INTEGER NOT NULL REFERENCES deck(id)
);
CREATE TABLE card_tag (
    card_id INTEGER NOT NULL REFERENCES card(id),
    tag_id INTEGER NOT NULL REFERENCES tag(id),
    PRIMARY KEY (card_id, tag_id)
);
CREATE TABLE user_card_srs (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES "user"(id),
    card_id INTEGER NOT NULL REFERENCES card(id),
    next_review_at TIMESTAMP NOT NULL,
    interval_days INTEGER NOT NULL,
    ease_factor REAL NOT NULL,
    repetitions INTEGER NOT NULL,
    last_reviewed_at TIMESTAMP
);
CREATE TABLE ai_chat (
    id INTEGER PRIMARY KEY,
    question TEXT,
    answer TEXT,
    aimodel_id INTEGER,
    user_id INTEGER REFERENCES "user"(id),
    created_at BIGINT
);
"#;

const FIXTURE_ROWS: &str = r#"
INSERT INTO theme (id, name, description, cssUrl, active)
    VALUES (1, 'Default', 'Test theme', '/theme.css', 1);
INSERT INTO "user" (id, username, password_hash, name, is_admin, is_active, profile_pic_url, theme_id)
    VALUES (1, 'alice', 'bcrypt$dummy', 'Alice', 0, 1, '/vite.svg', 1);
INSERT INTO deck (id, name, description, user_id)
    VALUES (1, 'Deck 1', 'Desc', 1);
INSERT INTO tag (id, name) VALUES (1, 'tag1');
INSERT INTO deck_tag (deck_id, tag_id) VALUES (1, 1);
INSERT INTO card (id, front, back, deck_id) VALUES (1, 'front', 'back', 1);
INSERT INTO card_tag (card_id, tag_id) VALUES (1, 1);
INSERT INTO user_card_srs (id, user_id, card_id, next_review_at, interval_days, ease_factor, repetitions, last_reviewed_at)
    VALUES (1, 1, 1, '2026-01-02T10:00:00', 1, 2.5, 1, '2026-01-01T09:30:00');
INSERT INTO ai_chat (id, question, answer, aimodel_id, user_id, created_at)
    VALUES (1, 'q', 'a', NULL, 1, 1754000000000);
"#;

const ALL_TABLES: [&str; 9] = [
    "theme",
    "user",
    "deck",
    "tag",
    "deck_tag",
    "card",
    "card_tag",
    "user_card_srs",
    "ai_chat",
];

fn create_database(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA_DDL).unwrap();
}

fn seed_fixture(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(FIXTURE_ROWS).unwrap();
}

fn count_rows(path: &Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(
        &format!("SELECT COUNT(*) FROM \"{}\"", table),
        [],
        |row| row.get(0),
    )
    .unwrap()
}

fn query_string(path: &Path, sql: &str) -> String {
    let conn = Connection::open(path).unwrap();
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

async fn export_database(db_path: &Path, archive_path: &Path) {
    let db = DbHandle::connect(db_path.to_str().unwrap()).await.unwrap();
    let registry = SchemaRegistry::application_schema();
    export_to(&db, &registry, archive_path).await.unwrap();
}

fn read_archive_entry(archive_path: &Path, entry: &str) -> Vec<u8> {
    let file = std::fs::File::open(archive_path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut buf = Vec::new();
    zip.by_name(entry).unwrap().read_to_end(&mut buf).unwrap();
    buf
}

#[tokio::test]
async fn test_export_then_truncate_import_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("source.db");
    let archive_path = dir.path().join("dump.zip");

    create_database(&db_path);
    seed_fixture(&db_path);

    export_database(&db_path, &archive_path).await;

    // Validation requires no database connection.
    let manifest = validate_archive(&archive_path).unwrap();
    assert_eq!(manifest.format_version, FORMAT_VERSION);
    assert!(manifest.source_engine_name.starts_with("SQLite"));
    assert_eq!(manifest.tables.len(), 9);
    for table in &manifest.tables {
        assert_eq!(table.row_count, 1, "table {}", table.table);
    }

    // Truncate and import back into the same database.
    let db = DbHandle::connect(db_path.to_str().unwrap()).await.unwrap();
    let registry = SchemaRegistry::application_schema();
    import_from(&db, &registry, &archive_path, ImportMode::Truncate)
        .await
        .unwrap();
    drop(db);

    for table in ALL_TABLES {
        assert_eq!(count_rows(&db_path, table), 1, "table {}", table);
    }

    // Values survive the round trip.
    assert_eq!(
        query_string(&db_path, "SELECT username FROM \"user\" WHERE id = 1"),
        "alice"
    );
    assert_eq!(
        query_string(&db_path, "SELECT next_review_at FROM user_card_srs WHERE id = 1"),
        "2026-01-02T10:00:00"
    );
    let conn = Connection::open(&db_path).unwrap();
    let ease: f64 = conn
        .query_row("SELECT ease_factor FROM user_card_srs WHERE id = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(ease, 2.5);
    let created_at: i64 = conn
        .query_row("SELECT created_at FROM ai_chat WHERE id = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(created_at, 1_754_000_000_000);

    // Every foreign key resolves post-import.
    let dangling: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM deck WHERE user_id NOT IN (SELECT id FROM \"user\")",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(dangling, 0);
    let linked: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM card_tag
             JOIN card ON card.id = card_tag.card_id
             JOIN tag ON tag.id = card_tag.tag_id",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(linked, 1);
}

#[tokio::test]
async fn test_import_into_separate_empty_database() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    let target_path = dir.path().join("target.db");
    let archive_path = dir.path().join("dump.zip");

    create_database(&source_path);
    seed_fixture(&source_path);
    create_database(&target_path);

    export_database(&source_path, &archive_path).await;

    let db = DbHandle::connect(target_path.to_str().unwrap())
        .await
        .unwrap();
    let registry = SchemaRegistry::application_schema();
    import_from(&db, &registry, &archive_path, ImportMode::FailIfNotEmpty)
        .await
        .unwrap();
    drop(db);

    for table in ALL_TABLES {
        assert_eq!(
            count_rows(&target_path, table),
            count_rows(&source_path, table),
            "table {}",
            table
        );
    }
    assert_eq!(
        query_string(&target_path, "SELECT name FROM theme WHERE id = 1"),
        "Default"
    );
}

#[tokio::test]
async fn test_export_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("source.db");
    let first = dir.path().join("first.zip");
    let second = dir.path().join("second.zip");

    create_database(&db_path);
    seed_fixture(&db_path);

    export_database(&db_path, &first).await;
    export_database(&db_path, &second).await;

    // Table entries are byte-identical; only the manifest timestamp differs.
    for table in ALL_TABLES {
        let entry = format!("tables/{}.jsonl", table);
        assert_eq!(
            read_archive_entry(&first, &entry),
            read_archive_entry(&second, &entry),
            "entry {}",
            entry
        );
    }
}

#[tokio::test]
async fn test_fail_if_not_empty_rejects_populated_target() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("source.db");
    let archive_path = dir.path().join("dump.zip");

    create_database(&db_path);
    seed_fixture(&db_path);
    export_database(&db_path, &archive_path).await;

    let db = DbHandle::connect(db_path.to_str().unwrap()).await.unwrap();
    let registry = SchemaRegistry::application_schema();
    let err = import_from(&db, &registry, &archive_path, ImportMode::FailIfNotEmpty)
        .await
        .unwrap_err();
    drop(db);

    assert!(matches!(err, DumpError::TargetNotEmpty { .. }));

    // No mutation occurred.
    for table in ALL_TABLES {
        assert_eq!(count_rows(&db_path, table), 1, "table {}", table);
    }
}

/// Archive whose user table holds an undecodable id; theme holds a good row.
fn write_tampered_archive(path: &Path) -> PathBuf {
    let column = |name: &str| ColumnManifest {
        name: name.to_string(),
        native_type_code: "integer".to_string(),
        native_type_name: "INTEGER".to_string(),
        nullable: true,
    };

    let registry = SchemaRegistry::application_schema();
    let mut writer = ArchiveWriter::create(path).unwrap();
    let mut tables = Vec::new();

    for spec in registry.insertion_order() {
        writer.start_table(&spec.name).unwrap();
        let (columns, rows): (Vec<ColumnManifest>, u64) = match spec.name.as_str() {
            "theme" => {
                writer
                    .write_all(b"{\"id\":1,\"name\":\"Tampered\"}\n")
                    .unwrap();
                (vec![column("id"), column("name")], 1)
            }
            "user" => {
                writer.write_all(b"{\"id\":\"not-a-number\"}\n").unwrap();
                (vec![column("id")], 1)
            }
            _ => (vec![column("id")], 0),
        };
        tables.push(TableManifest {
            table: spec.name.clone(),
            columns,
            row_count: rows,
            order_by: spec.order_by.clone(),
        });
    }

    writer
        .write_manifest(&Manifest {
            format_version: FORMAT_VERSION,
            exported_at_epoch_millis: 0,
            source_engine_name: "SQLite 3.45.0".to_string(),
            tables,
        })
        .unwrap();
    writer.finish().unwrap();
    path.to_path_buf()
}

#[tokio::test]
async fn test_decode_error_rolls_back_whole_import() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("target.db");
    let archive_path = dir.path().join("tampered.zip");

    create_database(&db_path);
    write_tampered_archive(&archive_path);

    let db = DbHandle::connect(db_path.to_str().unwrap()).await.unwrap();
    let registry = SchemaRegistry::application_schema();
    let err = import_from(&db, &registry, &archive_path, ImportMode::FailIfNotEmpty)
        .await
        .unwrap_err();
    drop(db);

    match err {
        DumpError::Decode { table, column, .. } => {
            assert_eq!(table, "user");
            assert_eq!(column, "id");
        }
        other => panic!("expected decode error, got {:?}", other),
    }

    // The theme row decoded fine but its insert rolled back with the rest.
    assert_eq!(count_rows(&db_path, "theme"), 0);
    assert_eq!(count_rows(&db_path, "user"), 0);
}

#[tokio::test]
async fn test_failed_truncate_import_restores_prior_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("target.db");
    let archive_path = dir.path().join("tampered.zip");

    create_database(&db_path);
    seed_fixture(&db_path);
    write_tampered_archive(&archive_path);

    let db = DbHandle::connect(db_path.to_str().unwrap()).await.unwrap();
    let registry = SchemaRegistry::application_schema();
    let err = import_from(&db, &registry, &archive_path, ImportMode::Truncate)
        .await
        .unwrap_err();
    drop(db);

    assert!(matches!(err, DumpError::Decode { .. }));

    // Truncation and partial inserts rolled back together: the prior state
    // is intact and nothing from the archive leaked in.
    for table in ALL_TABLES {
        assert_eq!(count_rows(&db_path, table), 1, "table {}", table);
    }
    assert_eq!(
        query_string(&db_path, "SELECT name FROM theme WHERE id = 1"),
        "Default"
    );
}

#[tokio::test]
async fn test_import_skips_columns_missing_on_target() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    let target_path = dir.path().join("target.db");
    let archive_path = dir.path().join("dump.zip");

    create_database(&source_path);
    seed_fixture(&source_path);

    // The target's theme table has evolved: no description column.
    let conn = Connection::open(&target_path).unwrap();
    conn.execute_batch(
        &SCHEMA_DDL.replace("description TEXT,\n    cssUrl TEXT", "cssUrl TEXT"),
    )
    .unwrap();
    drop(conn);

    export_database(&source_path, &archive_path).await;

    let db = DbHandle::connect(target_path.to_str().unwrap())
        .await
        .unwrap();
    let registry = SchemaRegistry::application_schema();
    import_from(&db, &registry, &archive_path, ImportMode::FailIfNotEmpty)
        .await
        .unwrap();
    drop(db);

    assert_eq!(count_rows(&target_path, "theme"), 1);
    assert_eq!(
        query_string(&target_path, "SELECT name FROM theme WHERE id = 1"),
        "Default"
    );
}
