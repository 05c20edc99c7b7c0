//! Credential extraction
//!
//! Pure functions from a narrowed [`DatabaseConfig`] variant to the record a
//! driver needs. Optional fields stay optional: no port, user or password is
//! invented here. Drivers apply their own defaults when connecting.

use crate::config::{
    DatabaseConfig, Dialect, Driver, GelConfig, GelTlsSecurity, MysqlConfig, MysqlSsl,
    PostgresConfig, PostgresSsl, SqliteConfig, TursoConfig,
};
use crate::error::{Error, Result};

// ============================================================================
// Credentials
// ============================================================================

/// Credentials for any dialect
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    Postgres(PostgresCredentials),
    Sqlite(SqliteCredentials),
    Turso(TursoCredentials),
    Mysql(MysqlCredentials),
    SingleStore(MysqlCredentials),
    Gel(GelCredentials),
}

/// PostgreSQL credentials
#[derive(Debug, Clone, PartialEq)]
pub enum PostgresCredentials {
    Url {
        url: Box<str>,
    },
    Host {
        host: Box<str>,
        port: Option<u16>,
        user: Option<Box<str>>,
        password: Option<Box<str>>,
        database: Box<str>,
        ssl: Option<PostgresSsl>,
    },
    /// AWS RDS Data API
    AwsDataApi {
        database: Box<str>,
        secret_arn: Box<str>,
        resource_arn: Box<str>,
    },
    Pglite {
        url: Box<str>,
    },
}

/// SQLite credentials
#[derive(Debug, Clone, PartialEq)]
pub enum SqliteCredentials {
    /// Local file (`./dev.db`, `file:dev.db`, `:memory:`)
    Url { url: Box<str> },
    /// Cloudflare D1 over HTTP
    D1Http {
        account_id: Box<str>,
        database_id: Box<str>,
        token: Box<str>,
    },
}

/// Turso / libSQL credentials
#[derive(Debug, Clone, PartialEq)]
pub struct TursoCredentials {
    pub url: Box<str>,
    pub auth_token: Option<Box<str>>,
}

/// MySQL credentials (also used for SingleStore)
#[derive(Debug, Clone, PartialEq)]
pub enum MysqlCredentials {
    Url {
        url: Box<str>,
    },
    Host {
        host: Box<str>,
        port: Option<u16>,
        user: Option<Box<str>>,
        password: Option<Box<str>>,
        database: Box<str>,
        ssl: Option<MysqlSsl>,
    },
}

/// Gel credentials
#[derive(Debug, Clone, PartialEq)]
pub enum GelCredentials {
    Url {
        url: Box<str>,
        tls_security: Option<GelTlsSecurity>,
    },
    Host {
        host: Box<str>,
        port: Option<u16>,
        user: Option<Box<str>>,
        password: Option<Box<str>>,
        database: Box<str>,
        tls_security: Option<GelTlsSecurity>,
    },
    /// Connect to the default local instance.
    Default,
}

impl Credentials {
    pub const fn dialect(&self) -> Dialect {
        match self {
            Self::Postgres(_) => Dialect::Postgresql,
            Self::Sqlite(_) => Dialect::Sqlite,
            Self::Turso(_) => Dialect::Turso,
            Self::Mysql(_) => Dialect::Mysql,
            Self::SingleStore(_) => Dialect::Singlestore,
            Self::Gel(_) => Dialect::Gel,
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract credentials from any configuration.
pub fn extract_credentials(config: &DatabaseConfig) -> Result<Credentials> {
    Ok(match config {
        DatabaseConfig::Postgres(c) => Credentials::Postgres(extract_postgres_credentials(c)?),
        DatabaseConfig::Sqlite(c) => Credentials::Sqlite(extract_sqlite_credentials(c)?),
        DatabaseConfig::Turso(c) => Credentials::Turso(extract_turso_credentials(c)?),
        DatabaseConfig::Mysql(c) => Credentials::Mysql(extract_mysql_credentials(c)?),
        DatabaseConfig::SingleStore(c) => {
            Credentials::SingleStore(extract_singlestore_credentials(c)?)
        }
        DatabaseConfig::Gel(c) => Credentials::Gel(extract_gel_credentials(c)?),
    })
}

pub fn extract_postgres_credentials(config: &PostgresConfig) -> Result<PostgresCredentials> {
    let d = Dialect::Postgresql;
    Ok(match config {
        PostgresConfig::Url(c) => PostgresCredentials::Url {
            url: non_empty(d, "url", &c.url)?,
        },
        PostgresConfig::Host(c) => PostgresCredentials::Host {
            host: non_empty(d, "host", &c.host)?,
            port: c.port,
            user: c.user.as_deref().map(Into::into),
            password: c.password.as_deref().map(Into::into),
            database: non_empty(d, "database", &c.database)?,
            ssl: c.ssl.clone(),
        },
        PostgresConfig::AwsDataApi(c) => PostgresCredentials::AwsDataApi {
            database: non_empty(d, "database", &c.database)?,
            secret_arn: non_empty(d, "secretArn", &c.secret_arn)?,
            resource_arn: non_empty(d, "resourceArn", &c.resource_arn)?,
        },
        PostgresConfig::Pglite(c) => PostgresCredentials::Pglite {
            url: non_empty(d, "url", &c.url)?,
        },
    })
}

pub fn extract_sqlite_credentials(config: &SqliteConfig) -> Result<SqliteCredentials> {
    let d = Dialect::Sqlite;
    match config {
        SqliteConfig::Url(c) => Ok(SqliteCredentials::Url {
            url: non_empty(d, "url", &c.url)?,
        }),
        SqliteConfig::D1Http(c) => Ok(SqliteCredentials::D1Http {
            account_id: non_empty(d, "accountId", &c.account_id)?,
            database_id: non_empty(d, "databaseId", &c.database_id)?,
            token: non_empty(d, "token", &c.token)?,
        }),
        SqliteConfig::Expo => Err(unsupported_runtime(Driver::Expo)),
        SqliteConfig::DurableSqlite => Err(unsupported_runtime(Driver::DurableSqlite)),
    }
}

pub fn extract_turso_credentials(config: &TursoConfig) -> Result<TursoCredentials> {
    Ok(TursoCredentials {
        url: non_empty(Dialect::Turso, "url", &config.url)?,
        auth_token: config.auth_token.as_deref().map(Into::into),
    })
}

pub fn extract_mysql_credentials(config: &MysqlConfig) -> Result<MysqlCredentials> {
    mysql_family(Dialect::Mysql, config)
}

pub fn extract_singlestore_credentials(config: &MysqlConfig) -> Result<MysqlCredentials> {
    mysql_family(Dialect::Singlestore, config)
}

pub fn extract_gel_credentials(config: &GelConfig) -> Result<GelCredentials> {
    let d = Dialect::Gel;
    Ok(match config {
        GelConfig::Url(c) => GelCredentials::Url {
            url: non_empty(d, "url", &c.url)?,
            tls_security: c.tls_security,
        },
        GelConfig::Host(c) => GelCredentials::Host {
            host: non_empty(d, "host", &c.host)?,
            port: c.port,
            user: c.user.as_deref().map(Into::into),
            password: c.password.as_deref().map(Into::into),
            database: non_empty(d, "database", &c.database)?,
            tls_security: c.tls_security,
        },
        GelConfig::Default => GelCredentials::Default,
    })
}

fn mysql_family(d: Dialect, config: &MysqlConfig) -> Result<MysqlCredentials> {
    Ok(match config {
        MysqlConfig::Url(c) => MysqlCredentials::Url {
            url: non_empty(d, "url", &c.url)?,
        },
        MysqlConfig::Host(c) => MysqlCredentials::Host {
            host: non_empty(d, "host", &c.host)?,
            port: c.port,
            user: c.user.as_deref().map(Into::into),
            password: c.password.as_deref().map(Into::into),
            database: non_empty(d, "database", &c.database)?,
            ssl: c.ssl.clone(),
        },
    })
}

fn non_empty(dialect: Dialect, field: &str, value: &str) -> Result<Box<str>> {
    if value.trim().is_empty() {
        return Err(Error::invalid(dialect, format!("`{field}` must not be empty")));
    }
    Ok(value.into())
}

fn unsupported_runtime(driver: Driver) -> Error {
    Error::DriverNotSupported {
        driver: driver.as_str().to_string(),
        reason: "it only runs inside its own JavaScript runtime".into(),
    }
}
