//! # db-ops
//!
//! Database operations around drizzle-kit: health check, reset, truncate,
//! list, seed and refresh, for every dialect a drizzle config can describe.
//!
//! ```rust,no_run
//! use db_ops::config::DatabaseConfig;
//! use db_ops::ops::reset_database;
//!
//! let config = DatabaseConfig::from_value(&serde_json::json!({
//!     "dialect": "sqlite",
//!     "dbCredentials": { "url": "./app.db" }
//! }))?;
//! let result = reset_database(&config);
//! println!("dropped {:?}", result.tables_dropped);
//! # Ok::<(), db_ops::Error>(())
//! ```
//!
//! ## Database Support
//!
//! | Dialect     | Driver          | Feature Flag     |
//! |-------------|-----------------|------------------|
//! | PostgreSQL  | postgres        | `postgres-sync`  |
//! | PostgreSQL  | tokio-postgres  | `tokio-postgres` |
//! | PostgreSQL  | RDS Data API    | `aws-data-api`   |
//! | SQLite      | libsql          | `libsql`         |
//! | SQLite      | rusqlite        | `rusqlite`       |
//! | SQLite      | Cloudflare D1   | `d1-http`        |
//! | Turso       | libsql (remote) | `turso`          |
//! | MySQL       | mysql_async     | `mysql`          |
//! | SingleStore | mysql_async     | `mysql`          |
//! | Gel         | tokio-postgres  | `gel`            |
//!
//! When several drivers for a dialect are compiled in, the first one in
//! the table wins.

pub mod config;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod introspect;
pub mod ops;
pub mod safety;
pub mod script;
pub mod toolkit;

// =============================================================================
// Root-level exports
// =============================================================================

pub use config::{DatabaseConfig, Dialect, Driver};
pub use credentials::{Credentials, extract_credentials};
pub use driver::{Connection, DriverKind, DriverRegistry, connect};
pub use error::{Error, Result};
pub use introspect::{ALLOWLIST, TableSet, is_allowlisted};
pub use ops::{
    HealthResult, HealthStatus, ListResult, ResetResult, SeedResult, TruncateResult, check_health,
    list_database, reset_database, seed_database, truncate_database,
};
pub use safety::Environment;
pub use toolkit::{KitCommand, Toolkit};
