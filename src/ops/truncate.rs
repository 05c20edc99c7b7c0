use serde::Serialize;

use super::{with_connection, without_foreign_keys};
use crate::config::{DatabaseConfig, Dialect};
use crate::driver::{Connection, DriverRegistry};
use crate::error::Result;
use crate::introspect::{self, qualified, quote_ident};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncateResult {
    pub success: bool,
    pub tables_truncated: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Delete all rows from every non-allowlisted table, keeping the tables.
pub fn truncate_database(config: &DatabaseConfig) -> TruncateResult {
    truncate_database_with(&DriverRegistry::default(), config)
}

pub fn truncate_database_with(registry: &DriverRegistry, config: &DatabaseConfig) -> TruncateResult {
    with_connection(registry, config, truncate_connection).unwrap_or_else(|e| TruncateResult {
        success: false,
        tables_truncated: Vec::new(),
        error: Some(e.to_string()),
    })
}

pub fn truncate_connection(conn: &mut Connection) -> TruncateResult {
    let mut truncated = Vec::new();
    match truncate_all(conn, &mut truncated) {
        Ok(()) => {
            tracing::info!(count = truncated.len(), "truncate complete");
            TruncateResult {
                success: true,
                tables_truncated: truncated,
                error: None,
            }
        }
        Err(e) => TruncateResult {
            success: false,
            tables_truncated: truncated,
            error: Some(e.to_string()),
        },
    }
}

fn truncate_all(conn: &mut Connection, truncated: &mut Vec<String>) -> Result<()> {
    let dialect = conn.dialect();
    let set = introspect::list_tables(conn)?;

    match dialect {
        Dialect::Postgresql => {
            for table in &set.tables {
                conn.execute(&format!(
                    "TRUNCATE TABLE {} RESTART IDENTITY CASCADE",
                    quote_ident(dialect, table)
                ))?;
                truncated.push(table.clone());
            }
            for table in &set.schema_tables {
                conn.execute(&format!(
                    "TRUNCATE TABLE {} RESTART IDENTITY CASCADE",
                    qualified(dialect, Some(&table.schema), &table.name)
                ))?;
                truncated.push(table.to_string());
            }
            Ok(())
        }
        Dialect::Mysql | Dialect::Singlestore => without_foreign_keys(conn, |conn| {
            for table in &set.tables {
                conn.execute(&format!("TRUNCATE TABLE {}", quote_ident(dialect, table)))?;
                truncated.push(table.clone());
            }
            Ok(())
        }),
        Dialect::Sqlite | Dialect::Turso => without_foreign_keys(conn, |conn| {
            for table in &set.tables {
                conn.execute(&format!("DELETE FROM {}", quote_ident(dialect, table)))?;
                truncated.push(table.clone());
            }
            Ok(())
        }),
        Dialect::Gel => {
            for table in &set.tables {
                conn.execute(&format!("DELETE FROM {}", quote_ident(dialect, table)))?;
                truncated.push(table.clone());
            }
            Ok(())
        }
    }
}
