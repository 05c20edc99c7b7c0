//! Configuration model
//!
//! A drizzle-kit configuration is a loosely shaped document: the `dialect`
//! field picks the database family, an optional `driver` field picks a
//! managed backend, and the keys inside `dbCredentials` pick between the
//! host-based and URL-based forms. [`DatabaseConfig::from_value`] turns such a
//! document into exactly one typed variant.

pub mod file;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Dialect
// ============================================================================

/// Database dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(alias = "postgres")]
    Postgresql,
    Sqlite,
    Turso,
    Mysql,
    Singlestore,
    Gel,
}

impl Dialect {
    pub const ALL: &'static [Dialect] = &[
        Self::Postgresql,
        Self::Sqlite,
        Self::Turso,
        Self::Mysql,
        Self::Singlestore,
        Self::Gel,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Sqlite => "sqlite",
            Self::Turso => "turso",
            Self::Mysql => "mysql",
            Self::Singlestore => "singlestore",
            Self::Gel => "gel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "postgresql" | "postgres" => Some(Self::Postgresql),
            "sqlite" => Some(Self::Sqlite),
            "turso" => Some(Self::Turso),
            "mysql" => Some(Self::Mysql),
            "singlestore" => Some(Self::Singlestore),
            "gel" => Some(Self::Gel),
            _ => None,
        }
    }

    /// SQLite and Turso share introspection and destructive-operation SQL.
    #[inline]
    pub const fn is_sqlite_family(self) -> bool {
        matches!(self, Self::Sqlite | Self::Turso)
    }

    #[inline]
    pub const fn is_mysql_family(self) -> bool {
        matches!(self, Self::Mysql | Self::Singlestore)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Explicit `driver` tag of a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Driver {
    AwsDataApi,
    Pglite,
    Turso,
    D1Http,
    Expo,
    DurableSqlite,
}

impl Driver {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwsDataApi => "aws-data-api",
            Self::Pglite => "pglite",
            Self::Turso => "turso",
            Self::D1Http => "d1-http",
            Self::Expo => "expo",
            Self::DurableSqlite => "durable-sqlite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "aws-data-api" => Some(Self::AwsDataApi),
            "pglite" => Some(Self::Pglite),
            "turso" => Some(Self::Turso),
            "d1-http" => Some(Self::D1Http),
            "expo" => Some(Self::Expo),
            "durable-sqlite" => Some(Self::DurableSqlite),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_valid_for(self, dialect: Dialect) -> bool {
        matches!(
            (self, dialect),
            (Self::AwsDataApi | Self::Pglite, Dialect::Postgresql)
                | (
                    Self::Turso | Self::D1Http | Self::Expo | Self::DurableSqlite,
                    Dialect::Sqlite
                )
        )
    }
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Shared option types
// ============================================================================

/// Postgres `ssl` setting, passed through untouched until the driver layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PostgresSsl {
    Enabled(bool),
    Mode(SslMode),
    Options(Map<String, Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Require,
    Allow,
    Prefer,
    VerifyFull,
}

/// MySQL `ssl` setting: a named profile or an options object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MysqlSsl {
    Profile(String),
    Options(MysqlSslOptions),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MysqlSslOptions {
    pub ca: Option<OneOrMany>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub passphrase: Option<String>,
    pub pfx: Option<String>,
    pub crl: Option<OneOrMany>,
    pub ciphers: Option<String>,
    pub reject_unauthorized: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Gel `tlsSecurity` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GelTlsSecurity {
    Insecure,
    NoHostVerification,
    Strict,
    Default,
}

// ============================================================================
// Variants
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UrlConfig {
    #[serde(deserialize_with = "non_blank")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostgresHostConfig {
    #[serde(deserialize_with = "non_blank")]
    pub host: String,
    #[serde(default, deserialize_with = "coerce_port")]
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(deserialize_with = "non_blank")]
    pub database: String,
    pub ssl: Option<PostgresSsl>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsDataApiConfig {
    #[serde(deserialize_with = "non_blank")]
    pub database: String,
    #[serde(deserialize_with = "non_blank")]
    pub secret_arn: String,
    #[serde(deserialize_with = "non_blank")]
    pub resource_arn: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostgresConfig {
    Host(PostgresHostConfig),
    Url(UrlConfig),
    AwsDataApi(AwsDataApiConfig),
    Pglite(UrlConfig),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct D1HttpConfig {
    #[serde(deserialize_with = "non_blank")]
    pub account_id: String,
    #[serde(deserialize_with = "non_blank")]
    pub database_id: String,
    #[serde(deserialize_with = "non_blank")]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqliteConfig {
    Url(UrlConfig),
    D1Http(D1HttpConfig),
    Expo,
    DurableSqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TursoConfig {
    #[serde(deserialize_with = "non_blank")]
    pub url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MysqlHostConfig {
    #[serde(deserialize_with = "non_blank")]
    pub host: String,
    #[serde(default, deserialize_with = "coerce_port")]
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(deserialize_with = "non_blank")]
    pub database: String,
    pub ssl: Option<MysqlSsl>,
}

/// MySQL configuration, also used for SingleStore.
#[derive(Debug, Clone, PartialEq)]
pub enum MysqlConfig {
    Host(MysqlHostConfig),
    Url(UrlConfig),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GelHostConfig {
    #[serde(deserialize_with = "non_blank")]
    pub host: String,
    #[serde(default, deserialize_with = "coerce_port")]
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(deserialize_with = "non_blank")]
    pub database: String,
    pub tls_security: Option<GelTlsSecurity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GelUrlConfig {
    #[serde(deserialize_with = "non_blank")]
    pub url: String,
    pub tls_security: Option<GelTlsSecurity>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GelConfig {
    Host(GelHostConfig),
    Url(GelUrlConfig),
    /// No credentials: use the default local instance.
    Default,
}

/// A configuration narrowed to exactly one dialect/driver variant.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    Postgres(PostgresConfig),
    Sqlite(SqliteConfig),
    Turso(TursoConfig),
    Mysql(MysqlConfig),
    SingleStore(MysqlConfig),
    Gel(GelConfig),
}

// ============================================================================
// Dispatch
// ============================================================================

impl DatabaseConfig {
    /// Narrow a raw configuration document.
    ///
    /// Precedence: `dialect`, then `driver`, then the shape of
    /// `dbCredentials`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let unsupported = || Error::UnsupportedConfiguration {
            config: value.to_string(),
        };

        let obj = value.as_object().ok_or_else(unsupported)?;
        let dialect = obj
            .get("dialect")
            .and_then(Value::as_str)
            .and_then(Dialect::parse)
            .ok_or_else(unsupported)?;

        let driver = match obj.get("driver") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                Driver::parse(s)
                    .filter(|d| d.is_valid_for(dialect))
                    .ok_or_else(unsupported)?,
            ),
            Some(_) => return Err(unsupported()),
        };

        let creds = match obj.get("dbCredentials") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(Error::invalid(dialect, "dbCredentials must be an object"));
            }
        };

        let config = match dialect {
            Dialect::Postgresql => Self::Postgres(postgres_variant(driver, creds)?),
            Dialect::Sqlite => match driver {
                Some(Driver::Turso) => Self::Turso(parse(dialect, required(dialect, creds)?)?),
                _ => Self::Sqlite(sqlite_variant(driver, creds)?),
            },
            Dialect::Turso => Self::Turso(parse(dialect, required(dialect, creds)?)?),
            Dialect::Mysql => Self::Mysql(mysql_variant(dialect, creds)?),
            Dialect::Singlestore => Self::SingleStore(mysql_variant(dialect, creds)?),
            Dialect::Gel => Self::Gel(gel_variant(creds)?),
        };

        tracing::debug!(dialect = %config.dialect(), driver = ?config.driver(), "config.narrowed");
        Ok(config)
    }

    /// The dialect this variant belongs to.
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

    /// The explicit driver tag this variant corresponds to, if any.
    pub const fn driver(&self) -> Option<Driver> {
        match self {
            Self::Postgres(PostgresConfig::AwsDataApi(_)) => Some(Driver::AwsDataApi),
            Self::Postgres(PostgresConfig::Pglite(_)) => Some(Driver::Pglite),
            Self::Sqlite(SqliteConfig::D1Http(_)) => Some(Driver::D1Http),
            Self::Sqlite(SqliteConfig::Expo) => Some(Driver::Expo),
            Self::Sqlite(SqliteConfig::DurableSqlite) => Some(Driver::DurableSqlite),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_postgres(&self) -> bool {
        matches!(self, Self::Postgres(_))
    }

    /// True for both SQLite and Turso configurations.
    #[inline]
    pub const fn is_sqlite_family(&self) -> bool {
        matches!(self, Self::Sqlite(_) | Self::Turso(_))
    }

    #[inline]
    pub const fn is_turso(&self) -> bool {
        matches!(self, Self::Turso(_))
    }

    #[inline]
    pub const fn is_mysql(&self) -> bool {
        matches!(self, Self::Mysql(_))
    }

    #[inline]
    pub const fn is_singlestore(&self) -> bool {
        matches!(self, Self::SingleStore(_))
    }

    #[inline]
    pub const fn is_gel(&self) -> bool {
        matches!(self, Self::Gel(_))
    }
}

impl TryFrom<&Value> for DatabaseConfig {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Self::from_value(value)
    }
}

fn postgres_variant(driver: Option<Driver>, creds: Option<&Map<String, Value>>) -> Result<PostgresConfig> {
    let dialect = Dialect::Postgresql;
    let creds = required(dialect, creds)?;
    Ok(match driver {
        Some(Driver::AwsDataApi) => PostgresConfig::AwsDataApi(parse(dialect, creds)?),
        Some(Driver::Pglite) => PostgresConfig::Pglite(parse(dialect, creds)?),
        _ if creds.contains_key("host") => PostgresConfig::Host(parse(dialect, creds)?),
        _ if creds.contains_key("url") => PostgresConfig::Url(parse(dialect, creds)?),
        _ => return Err(missing_shape(dialect)),
    })
}

fn sqlite_variant(driver: Option<Driver>, creds: Option<&Map<String, Value>>) -> Result<SqliteConfig> {
    let dialect = Dialect::Sqlite;
    Ok(match driver {
        Some(Driver::Expo) => SqliteConfig::Expo,
        Some(Driver::DurableSqlite) => SqliteConfig::DurableSqlite,
        Some(Driver::D1Http) => SqliteConfig::D1Http(parse(dialect, required(dialect, creds)?)?),
        _ => SqliteConfig::Url(parse(dialect, required(dialect, creds)?)?),
    })
}

fn mysql_variant(dialect: Dialect, creds: Option<&Map<String, Value>>) -> Result<MysqlConfig> {
    let creds = required(dialect, creds)?;
    if creds.contains_key("host") {
        Ok(MysqlConfig::Host(parse(dialect, creds)?))
    } else if creds.contains_key("url") {
        Ok(MysqlConfig::Url(parse(dialect, creds)?))
    } else {
        Err(missing_shape(dialect))
    }
}

fn gel_variant(creds: Option<&Map<String, Value>>) -> Result<GelConfig> {
    let dialect = Dialect::Gel;
    Ok(match creds {
        Some(c) if c.contains_key("host") => GelConfig::Host(parse(dialect, c)?),
        Some(c) if c.contains_key("url") => GelConfig::Url(parse(dialect, c)?),
        _ => GelConfig::Default,
    })
}

fn required(dialect: Dialect, creds: Option<&Map<String, Value>>) -> Result<&Map<String, Value>> {
    creds.ok_or_else(|| Error::invalid(dialect, "missing dbCredentials"))
}

fn missing_shape(dialect: Dialect) -> Error {
    Error::invalid(dialect, "dbCredentials must contain either `url` or `host`")
}

fn parse<T: serde::de::DeserializeOwned>(dialect: Dialect, creds: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(creds.clone()))
        .map_err(|e| Error::invalid(dialect, e.to_string()))
}

/// Required string fields must carry a value, not just be present.
fn non_blank<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("required field must not be empty"));
    }
    Ok(value)
}

/// Ports may be written as numbers or numeric strings.
fn coerce_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Num(u16),
        Str(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Num(0)) => Err(serde::de::Error::custom("port must be at least 1")),
        Some(Port::Num(n)) => Ok(Some(n)),
        Some(Port::Str(s)) => match s.trim().parse::<u16>() {
            Ok(0) | Err(_) => Err(serde::de::Error::custom(format!("invalid port '{s}'"))),
            Ok(n) => Ok(Some(n)),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
