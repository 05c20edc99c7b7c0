//! SQLite family drivers: rusqlite and libSQL (local file or remote Turso).

use super::Client;
use crate::error::{Error, Result};

// ============================================================================
// rusqlite
// ============================================================================

#[cfg(feature = "rusqlite")]
struct RusqliteClient {
    conn: rusqlite::Connection,
}

#[cfg(feature = "rusqlite")]
pub(super) fn open_rusqlite(path: &str) -> Result<Box<dyn Client>> {
    let conn = rusqlite::Connection::open(path).map_err(|e| {
        Error::Connection(format!("Failed to open SQLite database '{}': {}", path, e))
    })?;
    Ok(Box::new(RusqliteClient { conn }))
}

#[cfg(feature = "rusqlite")]
impl Client for RusqliteClient {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::query(sql, e))
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        use rusqlite::types::ValueRef;

        let mut stmt = self.conn.prepare(sql).map_err(|e| Error::query(sql, e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(match row.get_ref(0)? {
                    ValueRef::Null => String::new(),
                    ValueRef::Integer(i) => i.to_string(),
                    ValueRef::Real(f) => f.to_string(),
                    ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
                })
            })
            .map_err(|e| Error::query(sql, e))?;

        let values = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::query(sql, e))?;
        Ok(values)
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::Connection(e.to_string()))
    }
}

// ============================================================================
// libSQL
// ============================================================================

#[cfg(any(feature = "libsql", feature = "turso"))]
struct LibsqlClient {
    rt: tokio::runtime::Runtime,
    // keeps the database handle alive for the connection
    _db: libsql::Database,
    conn: libsql::Connection,
}

#[cfg(any(feature = "libsql", feature = "turso"))]
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Connection(format!("Failed to create async runtime: {}", e)))
}

#[cfg(any(feature = "libsql", feature = "turso"))]
pub(super) fn open_libsql_local(path: &str) -> Result<Box<dyn Client>> {
    let rt = runtime()?;
    let db = rt
        .block_on(libsql::Builder::new_local(path).build())
        .map_err(|e| {
            Error::Connection(format!("Failed to open LibSQL database '{}': {}", path, e))
        })?;
    let conn = db
        .connect()
        .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(Box::new(LibsqlClient { rt, _db: db, conn }))
}

#[cfg(feature = "turso")]
pub(super) fn open_libsql_remote(url: &str, auth_token: Option<&str>) -> Result<Box<dyn Client>> {
    let rt = runtime()?;
    let builder =
        libsql::Builder::new_remote(url.to_string(), auth_token.unwrap_or("").to_string());
    let db = rt.block_on(builder.build()).map_err(|e| {
        Error::Connection(format!("Failed to connect to Turso '{}': {}", url, e))
    })?;
    let conn = db
        .connect()
        .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(Box::new(LibsqlClient { rt, _db: db, conn }))
}

#[cfg(any(feature = "libsql", feature = "turso"))]
impl Client for LibsqlClient {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.rt
            .block_on(self.conn.execute_batch(sql))
            .map(drop)
            .map_err(|e| Error::query(sql, e))
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        let conn = &self.conn;
        self.rt.block_on(async {
            let mut rows = conn.query(sql, ()).await.map_err(|e| Error::query(sql, e))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next().await.map_err(|e| Error::query(sql, e))? {
                let value = row.get_value(0).map_err(|e| Error::query(sql, e))?;
                out.push(match value {
                    libsql::Value::Null => String::new(),
                    libsql::Value::Integer(i) => i.to_string(),
                    libsql::Value::Real(f) => f.to_string(),
                    libsql::Value::Text(s) => s,
                    libsql::Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
                });
            }
            Ok(out)
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(all(test, feature = "rusqlite"))]
mod tests {
    use super::*;

    #[test]
    fn rusqlite_values_as_text() {
        let mut client = open_rusqlite(":memory:").unwrap();
        client
            .execute("CREATE TABLE t (a INTEGER, b TEXT, c REAL); INSERT INTO t VALUES (1, 'x', 1.5), (NULL, NULL, NULL);")
            .unwrap();
        assert_eq!(client.query_column("SELECT a FROM t ORDER BY rowid").unwrap(), ["1", ""]);
        assert_eq!(client.query_column("SELECT b FROM t ORDER BY rowid").unwrap(), ["x", ""]);
        assert_eq!(client.query_column("SELECT c FROM t ORDER BY rowid").unwrap(), ["1.5", ""]);
        client.close().unwrap();
    }

    #[test]
    fn rusqlite_errors_carry_sql() {
        let mut client = open_rusqlite(":memory:").unwrap();
        let err = client.execute("DROP TABLE nope").unwrap_err();
        assert!(matches!(err, Error::Query { ref sql, .. } if sql == "DROP TABLE nope"));
    }
}
