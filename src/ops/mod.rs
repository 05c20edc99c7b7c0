//! Operation executors
//!
//! Each executor makes a single attempt and never returns `Err`: failures
//! are folded into the result value so callers can render or serialize them
//! as-is. The connection is closed before the executor returns.

mod health;
mod list;
mod reset;
mod seed;
mod truncate;

pub use health::{HealthResult, HealthStatus, check_health, check_health_with, format_postgres_version, health_of};
pub use list::{ListResult, list_connection, list_database, list_database_with};
pub use reset::{ResetResult, reset_connection, reset_database, reset_database_with};
pub use seed::{
    ENTRY_POINTS, ScriptSeedLoader, SeedLoader, SeedModule, SeedResult, SqlSeedLoader, parse_sql_seed,
    seed_database, seed_database_with,
};
pub use truncate::{TruncateResult, truncate_connection, truncate_database, truncate_database_with};

use crate::config::{DatabaseConfig, Dialect};
use crate::driver::{Connection, DriverRegistry};
use crate::error::Result;

/// Current time as RFC 3339
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Connect, run `op`, and close the connection whatever `op` returned.
pub(crate) fn with_connection<T>(
    registry: &DriverRegistry,
    config: &DatabaseConfig,
    op: impl FnOnce(&mut Connection) -> T,
) -> Result<T> {
    let mut conn = registry.connect(config)?;
    let out = op(&mut conn);
    if let Err(e) = conn.close() {
        tracing::warn!(error = %e, "failed to close connection");
    }
    Ok(out)
}

/// Run `op` with foreign-key enforcement switched off for the dialects that
/// support toggling it, restoring it afterwards even when `op` fails.
pub(crate) fn without_foreign_keys(
    conn: &mut Connection,
    op: impl FnOnce(&mut Connection) -> Result<()>,
) -> Result<()> {
    let (off, on) = match conn.dialect() {
        Dialect::Mysql | Dialect::Singlestore => {
            ("SET FOREIGN_KEY_CHECKS = 0", "SET FOREIGN_KEY_CHECKS = 1")
        }
        Dialect::Sqlite | Dialect::Turso => ("PRAGMA foreign_keys = OFF", "PRAGMA foreign_keys = ON"),
        Dialect::Postgresql | Dialect::Gel => return op(conn),
    };

    conn.execute(off)?;
    let result = op(conn);
    let restore = conn.execute(on);
    match (result, restore) {
        (Err(e), Err(restore_err)) => {
            tracing::warn!(error = %restore_err, "failed to re-enable foreign keys");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), restore) => restore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverKind;
    use crate::driver::mock::MockClient;
    use crate::error::Error;

    #[test]
    fn foreign_keys_restored_after_failure() {
        let (client, handle) = MockClient::new();
        let mut conn = Connection::new(Dialect::Mysql, DriverKind::MysqlAsync, Box::new(client));
        let err = without_foreign_keys(&mut conn, |_| Err(Error::Connection("boom".into())));
        assert!(err.is_err());
        assert_eq!(handle.executed(), ["SET FOREIGN_KEY_CHECKS = 0", "SET FOREIGN_KEY_CHECKS = 1"]);
    }

    #[test]
    fn postgres_has_no_bracket() {
        let (client, handle) = MockClient::new();
        let mut conn = Connection::new(Dialect::Postgresql, DriverKind::PostgresSync, Box::new(client));
        without_foreign_keys(&mut conn, |c| c.execute("SELECT 1")).unwrap();
        assert_eq!(handle.executed(), ["SELECT 1"]);
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let ts = timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok(), "{ts}");
    }
}
