use serde::Serialize;

use super::{with_connection, without_foreign_keys};
use crate::config::{DatabaseConfig, Dialect};
use crate::driver::{Connection, DriverRegistry};
use crate::error::{Error, Result};
use crate::introspect::{self, quote_ident};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResult {
    pub success: bool,
    pub tables_dropped: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResetResult {
    fn failed(tables_dropped: Vec<String>, error: &Error) -> Self {
        Self {
            success: false,
            tables_dropped,
            error: Some(error.to_string()),
        }
    }
}

/// Drop every non-allowlisted table (and, on Postgres, every user schema).
///
/// Statements run one at a time without a surrounding transaction: if one
/// fails, the tables dropped before it stay dropped and are reported.
pub fn reset_database(config: &DatabaseConfig) -> ResetResult {
    reset_database_with(&DriverRegistry::default(), config)
}

pub fn reset_database_with(registry: &DriverRegistry, config: &DatabaseConfig) -> ResetResult {
    if config.is_gel() {
        return ResetResult::failed(Vec::new(), &gel_unsupported());
    }
    with_connection(registry, config, reset_connection)
        .unwrap_or_else(|e| ResetResult::failed(Vec::new(), &e))
}

pub fn reset_connection(conn: &mut Connection) -> ResetResult {
    let mut dropped = Vec::new();
    match drop_all(conn, &mut dropped) {
        Ok(()) => {
            tracing::info!(count = dropped.len(), "reset complete");
            ResetResult {
                success: true,
                tables_dropped: dropped,
                error: None,
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, dropped = dropped.len(), "reset aborted");
            ResetResult::failed(dropped, &e)
        }
    }
}

fn drop_all(conn: &mut Connection, dropped: &mut Vec<String>) -> Result<()> {
    let dialect = conn.dialect();
    if dialect == Dialect::Gel {
        return Err(gel_unsupported());
    }

    let set = introspect::list_tables(conn)?;

    match dialect {
        Dialect::Postgresql => {
            for table in &set.tables {
                conn.execute(&format!(
                    "DROP TABLE IF EXISTS {} CASCADE",
                    quote_ident(dialect, table)
                ))?;
                dropped.push(table.clone());
            }
            for schema in &set.schemas {
                conn.execute(&format!(
                    "DROP SCHEMA IF EXISTS {} CASCADE",
                    quote_ident(dialect, schema)
                ))?;
                dropped.push(format!("schema:{schema}"));
            }
            Ok(())
        }
        Dialect::Mysql | Dialect::Singlestore => without_foreign_keys(conn, |conn| {
            for table in &set.tables {
                conn.execute(&format!(
                    "DROP TABLE IF EXISTS {} CASCADE",
                    quote_ident(dialect, table)
                ))?;
                dropped.push(table.clone());
            }
            Ok(())
        }),
        Dialect::Sqlite | Dialect::Turso => without_foreign_keys(conn, |conn| {
            for table in &set.tables {
                conn.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(dialect, table)))?;
                dropped.push(table.clone());
            }
            Ok(())
        }),
        Dialect::Gel => Err(gel_unsupported()),
    }
}

fn gel_unsupported() -> Error {
    Error::DriverNotSupported {
        driver: "gel".into(),
        reason: "Gel's SQL endpoint does not accept DDL; use `gel branch wipe` instead".into(),
    }
}
