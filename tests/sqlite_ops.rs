#![cfg(feature = "rusqlite")]

use std::fs;
use std::path::Path;

use db_ops::config::DatabaseConfig;
use db_ops::ops::{HealthStatus, check_health, list_database, reset_database, seed_database, truncate_database};
use rusqlite::Connection;
use tempfile::TempDir;

fn config_for(path: &Path) -> DatabaseConfig {
    DatabaseConfig::from_value(&serde_json::json!({
        "dialect": "sqlite",
        "dbCredentials": { "url": path.to_string_lossy() }
    }))
    .unwrap()
}

/// Database with two user tables, a migrations table and an AUTOINCREMENT
/// table (which creates `sqlite_sequence`).
fn fixture() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);
        CREATE TABLE posts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            title TEXT NOT NULL
        );
        CREATE TABLE __drizzle_migrations (id INTEGER PRIMARY KEY, hash TEXT NOT NULL);
        INSERT INTO users (name) VALUES ('ada'), ('grace');
        INSERT INTO posts (user_id, title) VALUES (1, 'hello'), (2, 'world'), (2, 'again');
        INSERT INTO __drizzle_migrations (hash) VALUES ('0000_init');
        "#,
    )
    .unwrap();
    (dir, path)
}

fn table_names(path: &Path) -> Vec<String> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

fn count(path: &Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn reset_drops_user_tables_and_is_idempotent() {
    let (_dir, path) = fixture();
    let config = config_for(&path);

    let first = reset_database(&config);
    assert!(first.success, "{:?}", first.error);
    assert_eq!(first.tables_dropped, ["posts", "users"]);

    let remaining = table_names(&path);
    assert!(remaining.contains(&"__drizzle_migrations".to_string()));
    assert!(!remaining.contains(&"users".to_string()));
    assert!(!remaining.contains(&"posts".to_string()));
    assert_eq!(count(&path, "__drizzle_migrations"), 1);

    let second = reset_database(&config);
    assert!(second.success);
    assert!(second.tables_dropped.is_empty());
}

#[test]
fn truncate_keeps_tables_and_empties_them() {
    let (_dir, path) = fixture();
    let before = table_names(&path);

    let result = truncate_database(&config_for(&path));
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.tables_truncated, ["posts", "users"]);

    assert_eq!(table_names(&path), before);
    assert_eq!(count(&path, "users"), 0);
    assert_eq!(count(&path, "posts"), 0);
    assert_eq!(count(&path, "__drizzle_migrations"), 1);
}

#[test]
fn list_skips_allowlisted_tables_and_counts_rows() {
    let (_dir, path) = fixture();

    let result = list_database(&config_for(&path), true);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.tables, ["posts", "users"]);
    assert!(result.schemas.is_empty());

    let counts = result.row_counts.unwrap();
    assert_eq!(counts["posts"], 3);
    assert_eq!(counts["users"], 2);
    assert!(!counts.contains_key("sqlite_sequence"));
}

#[test]
fn health_reports_sqlite_version() {
    let (_dir, path) = fixture();

    let result = check_health(&config_for(&path));
    assert_eq!(result.status, HealthStatus::Ok, "{:?}", result.message);
    let version = result.version.unwrap();
    assert!(version.starts_with('3'), "{version}");
    assert!(chrono::DateTime::parse_from_rfc3339(&result.timestamp).is_ok());
}

#[test]
fn sql_seed_runs_preferred_entry_point() {
    let (dir, path) = fixture();
    let config = config_for(&path);
    assert!(truncate_database(&config).success);

    let seed = dir.path().join("seed.sql");
    fs::write(
        &seed,
        "-- export: main\n\
         INSERT INTO users (name) VALUES ('main');\n\
         -- export: seed\n\
         INSERT INTO users (name) VALUES ('linus');\n\
         INSERT INTO posts (user_id, title) VALUES (last_insert_rowid(), 'seeded');\n",
    )
    .unwrap();

    let result = seed_database(&config, &seed);
    assert!(result.success, "{:?}", result.error);
    assert!(result.message.unwrap().contains("seed.sql"));

    let conn = Connection::open(&path).unwrap();
    let name: String = conn.query_row("SELECT name FROM users", [], |row| row.get(0)).unwrap();
    assert_eq!(name, "linus");
    assert_eq!(count(&path, "posts"), 1);
}

#[test]
fn seed_with_comment_header_runs_seed_export() {
    let (dir, path) = fixture();
    let config = config_for(&path);
    assert!(truncate_database(&config).success);

    let seed = dir.path().join("seed.sql");
    fs::write(
        &seed,
        "-- Development seed data\n\
         -- export: seed\n\
         INSERT INTO users (name) VALUES ('linus');\n",
    )
    .unwrap();

    let result = seed_database(&config, &seed);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(count(&path, "users"), 1);
}

#[test]
fn missing_seed_file_is_reported() {
    let (dir, path) = fixture();

    let result = seed_database(&config_for(&path), &dir.path().join("nope.sql"));
    assert!(!result.success);
    assert!(result.error.unwrap().contains("not found"));
    assert_eq!(count(&path, "users"), 2);
}
