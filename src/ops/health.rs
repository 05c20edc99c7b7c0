use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{timestamp, with_connection};
use crate::config::{DatabaseConfig, Dialect};
use crate::driver::{Connection, DriverRegistry};
use crate::error::Result;
use crate::introspect::queries;

static POSTGRES_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PostgreSQL (\d+\.\d+)(?:\.\d+)?\s*(?:on\s+([^,]+))?")
        .expect("valid postgres version pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl HealthResult {
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Connect, read the server version and run `SELECT 1`.
pub fn check_health(config: &DatabaseConfig) -> HealthResult {
    check_health_with(&DriverRegistry::default(), config)
}

pub fn check_health_with(registry: &DriverRegistry, config: &DatabaseConfig) -> HealthResult {
    let outcome = with_connection(registry, config, health_of).and_then(|r| r);
    match outcome {
        Ok(version) => HealthResult {
            status: HealthStatus::Ok,
            message: None,
            timestamp: timestamp(),
            version: Some(version),
        },
        Err(e) => HealthResult {
            status: HealthStatus::Error,
            message: Some(e.to_string()),
            timestamp: timestamp(),
            version: None,
        },
    }
}

/// Version string of the connected server, after a liveness probe.
pub fn health_of(conn: &mut Connection) -> Result<String> {
    let dialect = conn.dialect();
    let version_sql = match dialect {
        Dialect::Postgresql | Dialect::Gel => queries::POSTGRES_VERSION,
        Dialect::Sqlite | Dialect::Turso => queries::SQLITE_VERSION,
        Dialect::Mysql | Dialect::Singlestore => queries::MYSQL_VERSION,
    };
    let raw = conn.query_scalar(version_sql)?.unwrap_or_default();
    conn.query_column("SELECT 1")?;

    let version = match dialect {
        Dialect::Postgresql => format_postgres_version(&raw),
        Dialect::Turso => format!("Turso (SQLite {raw})"),
        Dialect::Gel if raw.is_empty() => "Gel Database".to_string(),
        _ => raw,
    };
    tracing::debug!(dialect = %dialect, version = %version, "health.ok");
    Ok(version)
}

/// Shorten `version()` output to "PostgreSQL <major.minor> on <platform>".
pub fn format_postgres_version(version: &str) -> String {
    if let Some(caps) = POSTGRES_VERSION.captures(version) {
        let number = &caps[1];
        return match caps.get(2) {
            Some(platform) => format!("PostgreSQL {number} on {}", platform.as_str().trim()),
            None => format!("PostgreSQL {number}"),
        };
    }
    if version.chars().count() > 50 {
        let head: String = version.chars().take(47).collect();
        format!("{head}...")
    } else {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverKind;
    use crate::driver::mock::MockClient;

    #[test]
    fn postgres_version_shortened() {
        assert_eq!(
            format_postgres_version(
                "PostgreSQL 17.5 on aarch64-unknown-linux-musl, compiled by gcc (Alpine 14.2.0) 14.2.0, 64-bit"
            ),
            "PostgreSQL 17.5 on aarch64-unknown-linux-musl"
        );
        assert_eq!(format_postgres_version("PostgreSQL 16.2.1"), "PostgreSQL 16.2");
        assert_eq!(format_postgres_version("CockroachDB"), "CockroachDB");

        let long = "x".repeat(60);
        let short = format_postgres_version(&long);
        assert_eq!(short.len(), 50);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn turso_version_label() {
        let (client, handle) = MockClient::new();
        handle.respond("sqlite_version()", &["3.45.1"]);
        let mut conn = Connection::new(Dialect::Turso, DriverKind::LibsqlRemote, Box::new(client));
        assert_eq!(health_of(&mut conn).unwrap(), "Turso (SQLite 3.45.1)");
        assert_eq!(handle.queried(), ["SELECT sqlite_version()", "SELECT 1"]);
    }

    #[test]
    fn failure_is_reported_not_raised() {
        let registry = DriverRegistry::with_availability(|_| false);
        let config = DatabaseConfig::from_value(&serde_json::json!({
            "dialect": "mysql",
            "dbCredentials": { "url": "mysql://localhost/app" }
        }))
        .unwrap();
        let result = check_health_with(&registry, &config);
        assert_eq!(result.status, HealthStatus::Error);
        assert!(result.message.unwrap().contains("mysql_async"));
        assert!(result.version.is_none());
    }

    #[test]
    fn serializes_like_the_cli_contract() {
        let result = HealthResult {
            status: HealthStatus::Ok,
            message: None,
            timestamp: "2026-01-01T00:00:00+00:00".into(),
            version: Some("3.45.1".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "ok", "timestamp": "2026-01-01T00:00:00+00:00", "version": "3.45.1" })
        );
    }
}
