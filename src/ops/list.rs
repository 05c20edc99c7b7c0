use std::collections::BTreeMap;

use serde::Serialize;

use super::with_connection;
use crate::config::DatabaseConfig;
use crate::driver::{Connection, DriverRegistry};
use crate::introspect;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub success: bool,
    /// Default-schema tables followed by `schema.table` entries
    pub tables: Vec<String>,
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_counts: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// List the tables an operation would touch, optionally with row counts.
pub fn list_database(config: &DatabaseConfig, count: bool) -> ListResult {
    list_database_with(&DriverRegistry::default(), config, count)
}

pub fn list_database_with(registry: &DriverRegistry, config: &DatabaseConfig, count: bool) -> ListResult {
    with_connection(registry, config, |conn| list_connection(conn, count)).unwrap_or_else(|e| ListResult {
        success: false,
        error: Some(e.to_string()),
        ..Default::default()
    })
}

pub fn list_connection(conn: &mut Connection, count: bool) -> ListResult {
    let set = match introspect::list_tables(conn) {
        Ok(set) => set,
        Err(e) => {
            return ListResult {
                success: false,
                error: Some(e.to_string()),
                ..Default::default()
            };
        }
    };

    let mut tables = set.tables.clone();
    tables.extend(set.schema_tables.iter().map(ToString::to_string));

    let row_counts = count.then(|| {
        let mut counts = BTreeMap::new();
        for table in &set.tables {
            counts.insert(table.clone(), count_or_zero(conn, None, table));
        }
        for table in &set.schema_tables {
            counts.insert(table.to_string(), count_or_zero(conn, Some(&table.schema), &table.name));
        }
        counts
    });

    ListResult {
        success: true,
        tables,
        schemas: set.schemas,
        row_counts,
        error: None,
    }
}

/// A failing count is logged and shown as zero.
fn count_or_zero(conn: &mut Connection, schema: Option<&str>, table: &str) -> u64 {
    introspect::count_rows(conn, schema, table).unwrap_or_else(|e| {
        tracing::warn!(table, error = %e, "failed to count rows");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dialect;
    use crate::driver::DriverKind;
    use crate::driver::mock::MockClient;

    #[test]
    fn lists_without_counts() {
        let (client, handle) = MockClient::new();
        let mut conn = Connection::new(Dialect::Sqlite, DriverKind::Rusqlite, Box::new(client));
        handle.respond("sqlite_master", &["posts", "sqlite_sequence", "users"]);

        let result = list_connection(&mut conn, false);
        assert!(result.success);
        assert_eq!(result.tables, ["posts", "users"]);
        assert!(result.row_counts.is_none());
        assert_eq!(handle.queried().len(), 1);
    }

    #[test]
    fn counts_default_to_zero_on_failure() {
        let (client, handle) = MockClient::new();
        let mut conn = Connection::new(Dialect::Postgresql, DriverKind::PostgresSync, Box::new(client));
        handle
            .respond("FROM \"users\"", &["7"])
            .fail_on("FROM \"auth\".\"sessions\"")
            .respond("table_schema = 'public'", &["users"])
            .respond("information_schema.schemata", &["auth"])
            .respond("table_schema IN ('auth')", &["auth.sessions"]);

        let result = list_connection(&mut conn, true);
        assert!(result.success);
        assert_eq!(result.tables, ["users", "auth.sessions"]);
        assert_eq!(result.schemas, ["auth"]);
        let counts = result.row_counts.unwrap();
        assert_eq!(counts["users"], 7);
        assert_eq!(counts["auth.sessions"], 0);
    }
}
