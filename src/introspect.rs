//! Table and schema introspection
//!
//! Catalog queries per dialect, filtered so that migration bookkeeping and
//! engine-owned objects never reach a destructive operation.

use std::sync::LazyLock;

use regex::RegexSet;
use serde::Serialize;

use crate::config::Dialect;
use crate::driver::Connection;
use crate::error::{Error, Result};

/// Names that are never listed, dropped or truncated.
pub const ALLOWLIST: &[&str] = &[
    // migration bookkeeping
    "__drizzle_migrations",
    "drizzle_migrations",
    "drizzle_migrations_journal",
    "__drizzle_migrations_journal",
    "migrations",
    "drizzle_query_log",
    "drizzle_query_log_entries",
    // postgres
    "pg_catalog",
    "information_schema",
    "pg_toast",
    // sqlite
    "sqlite_master",
    "sqlite_sequence",
    "sqlite_temp_master",
    // mysql
    "mysql",
    "performance_schema",
    "sys",
];

/// Schemas created by extensions rather than by the application.
static EXTENSION_SCHEMAS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^_timescaledb_",
        r"^timescaledb_",
        r"^postgis",
        r"^tiger$",
        r"^tiger_data$",
        r"^topology$",
    ])
    .expect("valid extension schema patterns")
});

pub fn is_allowlisted(name: &str) -> bool {
    ALLOWLIST.contains(&name) || name.starts_with("sqlite_")
}

/// Postgres schemas that belong to the application.
pub fn is_user_schema(name: &str) -> bool {
    name != "public"
        && !is_allowlisted(name)
        && !name.starts_with("pg_")
        && !EXTENSION_SCHEMAS.is_match(name)
}

/// Filter catalog names through the allowlist, keeping order.
pub fn filter_tables<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(Into::into)
        .filter(|n| !n.is_empty() && !is_allowlisted(n))
        .collect()
}

// ============================================================================
// TableSet
// ============================================================================

/// A table inside a non-default Postgres schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaTable {
    pub schema: String,
    pub name: String,
}

impl std::fmt::Display for SchemaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Everything an operation may touch, already filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSet {
    /// Tables in the default schema (`public` / the current database)
    pub tables: Vec<String>,
    /// User schemas (Postgres only)
    pub schemas: Vec<String>,
    /// Tables inside `schemas`
    pub schema_tables: Vec<SchemaTable>,
}

impl TableSet {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.schemas.is_empty() && self.schema_tables.is_empty()
    }
}

// ============================================================================
// Queries
// ============================================================================

pub mod queries {
    pub const POSTGRES_TABLES: &str = "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' ORDER BY table_name";

    pub const POSTGRES_SCHEMAS: &str =
        "SELECT schema_name FROM information_schema.schemata ORDER BY schema_name";

    pub const SQLITE_TABLES: &str =
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name";

    pub const MYSQL_TABLES: &str = "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' ORDER BY table_name";

    pub const GEL_TABLES: &str = "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' ORDER BY table_name";

    pub const POSTGRES_VERSION: &str = "SELECT version()";
    pub const SQLITE_VERSION: &str = "SELECT sqlite_version()";
    pub const MYSQL_VERSION: &str = "SELECT VERSION()";
}

/// Postgres tables inside the given schemas, qualified and ordered.
fn postgres_schema_tables_query(schemas: &[String]) -> String {
    let list = schemas
        .iter()
        .map(|s| quote_literal(s))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT table_schema || '.' || table_name FROM information_schema.tables \
         WHERE table_schema IN ({list}) AND table_type = 'BASE TABLE' \
         ORDER BY table_schema, table_name"
    )
}

/// Introspect the connected database.
pub fn list_tables(conn: &mut Connection) -> Result<TableSet> {
    let dialect = conn.dialect();
    let set = match dialect {
        Dialect::Postgresql => {
            let tables = filter_tables(conn.query_column(queries::POSTGRES_TABLES)?);
            let schemas: Vec<String> = conn
                .query_column(queries::POSTGRES_SCHEMAS)?
                .into_iter()
                .filter(|s| is_user_schema(s))
                .collect();
            let schema_tables = if schemas.is_empty() {
                Vec::new()
            } else {
                conn.query_column(&postgres_schema_tables_query(&schemas))?
                    .into_iter()
                    .filter_map(|qualified| {
                        let (schema, name) = qualified.split_once('.')?;
                        (!is_allowlisted(name)).then(|| SchemaTable {
                            schema: schema.to_string(),
                            name: name.to_string(),
                        })
                    })
                    .collect()
            };
            TableSet {
                tables,
                schemas,
                schema_tables,
            }
        }
        Dialect::Sqlite | Dialect::Turso => TableSet {
            tables: filter_tables(conn.query_column(queries::SQLITE_TABLES)?),
            ..Default::default()
        },
        Dialect::Mysql | Dialect::Singlestore => TableSet {
            tables: filter_tables(conn.query_column(queries::MYSQL_TABLES)?),
            ..Default::default()
        },
        Dialect::Gel => TableSet {
            tables: filter_tables(conn.query_column(queries::GEL_TABLES)?),
            ..Default::default()
        },
    };

    tracing::debug!(
        dialect = %dialect,
        tables = set.tables.len(),
        schemas = set.schemas.len(),
        "introspect.tables"
    );
    Ok(set)
}

/// Number of rows in `table`, optionally schema-qualified.
pub fn count_rows(conn: &mut Connection, schema: Option<&str>, table: &str) -> Result<u64> {
    let dialect = conn.dialect();
    let target = qualified(dialect, schema, table);
    let sql = if dialect.is_mysql_family() {
        format!("SELECT CAST(COUNT(*) AS CHAR) FROM {target}")
    } else {
        format!("SELECT CAST(COUNT(*) AS TEXT) FROM {target}")
    };
    let value = conn.query_scalar(&sql)?.unwrap_or_default();
    value
        .trim()
        .parse()
        .map_err(|_| Error::query(&sql, format!("unexpected count '{value}'")))
}

// ============================================================================
// Quoting
// ============================================================================

/// Quote an identifier for `dialect`.
pub fn quote_ident(dialect: Dialect, name: &str) -> String {
    if dialect.is_mysql_family() {
        format!("`{}`", name.replace('`', "``"))
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

pub fn qualified(dialect: Dialect, schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(dialect, schema), quote_ident(dialect, name)),
        None => quote_ident(dialect, name),
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockClient;
    use crate::driver::{Connection, DriverKind};

    fn mock(dialect: Dialect) -> (Connection, crate::driver::mock::MockHandle) {
        let (client, handle) = MockClient::new();
        (Connection::new(dialect, DriverKind::Rusqlite, Box::new(client)), handle)
    }

    #[test]
    fn allowlist_membership() {
        for name in ALLOWLIST {
            assert!(is_allowlisted(name), "{name}");
        }
        assert!(is_allowlisted("sqlite_stat1"));
        assert!(!is_allowlisted("users"));
        assert!(!is_allowlisted("drizzle_users"));
    }

    #[test]
    fn filtered_tables_never_hit_allowlist() {
        let names = ["users", "__drizzle_migrations", "posts", "sqlite_sequence", "", "migrations"];
        let filtered = filter_tables(names);
        assert_eq!(filtered, ["users", "posts"]);
        assert!(filtered.iter().all(|t| !is_allowlisted(t)));
    }

    #[test]
    fn user_schema_filter() {
        for schema in [
            "public",
            "information_schema",
            "pg_catalog",
            "pg_toast",
            "pg_temp_1",
            "_timescaledb_internal",
            "timescaledb_information",
            "postgis_topology",
            "tiger",
            "tiger_data",
            "topology",
        ] {
            assert!(!is_user_schema(schema), "{schema}");
        }
        assert!(is_user_schema("auth"));
        assert!(is_user_schema("tiger_team"));
        assert!(is_user_schema("billing"));
    }

    #[test]
    fn postgres_scenario() {
        let (mut conn, handle) = mock(Dialect::Postgresql);
        handle
            .respond("table_schema = 'public'", &["drizzle_migrations", "pg_toast", "users"])
            .respond("information_schema.schemata", &["public", "tiger"]);

        let set = list_tables(&mut conn).unwrap();
        assert_eq!(set.tables, ["users"]);
        assert!(set.schemas.is_empty());
        assert!(set.schema_tables.is_empty());
        assert_eq!(handle.queried().len(), 2);
    }

    #[test]
    fn postgres_user_schema_tables() {
        let (mut conn, handle) = mock(Dialect::Postgresql);
        handle
            .respond("table_schema = 'public'", &["users"])
            .respond("information_schema.schemata", &["auth", "pg_catalog", "public"])
            .respond("table_schema IN ('auth')", &["auth.sessions", "auth.migrations"]);

        let set = list_tables(&mut conn).unwrap();
        assert_eq!(set.schemas, ["auth"]);
        assert_eq!(
            set.schema_tables,
            [SchemaTable {
                schema: "auth".into(),
                name: "sessions".into()
            }]
        );
    }

    #[test]
    fn sqlite_scenario() {
        let (mut conn, handle) = mock(Dialect::Sqlite);
        handle.respond("sqlite_master", &["posts", "sqlite_sequence"]);
        assert_eq!(list_tables(&mut conn).unwrap().tables, ["posts"]);
    }

    #[test]
    fn queries_are_ordered() {
        for sql in [
            queries::POSTGRES_TABLES,
            queries::POSTGRES_SCHEMAS,
            queries::SQLITE_TABLES,
            queries::MYSQL_TABLES,
            queries::GEL_TABLES,
        ] {
            assert!(sql.contains("ORDER BY"), "{sql}");
        }
        assert!(postgres_schema_tables_query(&["a".into()]).contains("ORDER BY"));
    }

    #[test]
    fn views_are_never_listed() {
        let schema_tables = postgres_schema_tables_query(&["auth".into()]);
        for sql in [
            queries::POSTGRES_TABLES,
            queries::MYSQL_TABLES,
            queries::GEL_TABLES,
            schema_tables.as_str(),
        ] {
            if sql.contains("information_schema.tables") {
                assert!(sql.contains("table_type = 'BASE TABLE'"), "{sql}");
            }
        }
        assert!(queries::SQLITE_TABLES.contains("type = 'table'"));
    }

    #[test]
    fn identifier_quoting() {
        assert_eq!(quote_ident(Dialect::Postgresql, "users"), "\"users\"");
        assert_eq!(quote_ident(Dialect::Sqlite, "we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_ident(Dialect::Mysql, "or`der"), "`or``der`");
        assert_eq!(qualified(Dialect::Postgresql, Some("auth"), "users"), "\"auth\".\"users\"");
        assert_eq!(quote_literal("o'neil"), "'o''neil'");
    }

    #[test]
    fn count_rows_parses_text() {
        let (mut conn, handle) = mock(Dialect::Mysql);
        handle.respond("COUNT(*)", &["42"]);
        assert_eq!(count_rows(&mut conn, None, "users").unwrap(), 42);
        assert_eq!(handle.queried(), ["SELECT CAST(COUNT(*) AS CHAR) FROM `users`"]);
    }
}
