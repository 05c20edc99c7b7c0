//! PostgreSQL drivers: `postgres` (sync), `tokio-postgres`, the AWS RDS Data
//! API, and Gel's Postgres-protocol SQL endpoint.
//!
//! Both wire clients accept the same connection strings, so credentials are
//! first turned into a [`ConnectPlan`]: a URL or libpq key/value string with a
//! normalized `sslmode`, plus the TLS verification level.

#![cfg_attr(
    not(all(feature = "postgres-sync", feature = "tokio-postgres", feature = "gel")),
    allow(dead_code)
)]

use super::{Client, mask_url};
use crate::config::{GelTlsSecurity, PostgresSsl, SslMode};
use crate::credentials::{GelCredentials, PostgresCredentials};
use crate::error::{Error, Result};

const GEL_DEFAULT_HOST: &str = "localhost";
const GEL_DEFAULT_PORT: u16 = 5656;
const GEL_DEFAULT_USER: &str = "admin";
const GEL_DEFAULT_BRANCH: &str = "main";

// ============================================================================
// Connection plan
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PgTls {
    Disabled,
    /// Encrypt without checking the certificate chain or host name.
    Unverified,
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ConnectPlan {
    pub params: String,
    pub tls: PgTls,
    /// Safe to log
    pub display: String,
}

pub(super) fn postgres_plan(creds: &PostgresCredentials) -> Result<ConnectPlan> {
    match creds {
        PostgresCredentials::Url { url } => {
            let tls = tls_from_url(url);
            Ok(ConnectPlan {
                params: with_sslmode(url, tls),
                tls,
                display: mask_url(url),
            })
        }
        PostgresCredentials::Host {
            host,
            port,
            user,
            password,
            database,
            ssl,
        } => {
            let tls = tls_from_option(ssl.as_ref());
            let user = user.as_deref().map(str::to_string).or_else(default_user);
            Ok(ConnectPlan {
                params: key_values(host, *port, user.as_deref(), password.as_deref(), database, tls),
                tls,
                display: format!("{}:{}/{}", host, port.unwrap_or(5432), database),
            })
        }
        PostgresCredentials::AwsDataApi { .. } | PostgresCredentials::Pglite { .. } => {
            Err(Error::Connection(
                "credentials do not describe a Postgres server".into(),
            ))
        }
    }
}

pub(super) fn gel_plan(creds: &GelCredentials) -> ConnectPlan {
    match creds {
        GelCredentials::Default => ConnectPlan {
            params: key_values(
                GEL_DEFAULT_HOST,
                Some(GEL_DEFAULT_PORT),
                Some(GEL_DEFAULT_USER),
                None,
                GEL_DEFAULT_BRANCH,
                PgTls::Unverified,
            ),
            tls: PgTls::Unverified,
            display: format!("{GEL_DEFAULT_HOST}:{GEL_DEFAULT_PORT}/{GEL_DEFAULT_BRANCH}"),
        },
        GelCredentials::Host {
            host,
            port,
            user,
            password,
            database,
            tls_security,
        } => {
            let tls = gel_tls(*tls_security);
            let port = port.unwrap_or(GEL_DEFAULT_PORT);
            ConnectPlan {
                params: key_values(
                    host,
                    Some(port),
                    Some(user.as_deref().unwrap_or(GEL_DEFAULT_USER)),
                    password.as_deref(),
                    database,
                    tls,
                ),
                tls,
                display: format!("{host}:{port}/{database}"),
            }
        }
        GelCredentials::Url { url, tls_security } => {
            let tls = gel_tls(*tls_security);
            let url = url
                .strip_prefix("gel://")
                .or_else(|| url.strip_prefix("edgedb://"))
                .map(|rest| format!("postgresql://{rest}"))
                .unwrap_or_else(|| url.to_string());
            ConnectPlan {
                params: with_sslmode(&url, tls),
                tls,
                display: mask_url(&url),
            }
        }
    }
}

/// Gel always speaks TLS. Only `strict` asks for a verified chain; local
/// instances use self-signed certificates.
fn gel_tls(security: Option<GelTlsSecurity>) -> PgTls {
    match security {
        Some(GelTlsSecurity::Strict) => PgTls::Verified,
        _ => PgTls::Unverified,
    }
}

fn tls_from_option(ssl: Option<&PostgresSsl>) -> PgTls {
    match ssl {
        None | Some(PostgresSsl::Enabled(false)) => PgTls::Disabled,
        Some(PostgresSsl::Enabled(true)) | Some(PostgresSsl::Mode(SslMode::VerifyFull)) => PgTls::Verified,
        Some(PostgresSsl::Mode(SslMode::Require | SslMode::Allow | SslMode::Prefer)) => PgTls::Unverified,
        Some(PostgresSsl::Options(opts)) => match opts.get("rejectUnauthorized") {
            Some(serde_json::Value::Bool(false)) => PgTls::Unverified,
            _ => PgTls::Verified,
        },
    }
}

fn tls_from_url(url: &str) -> PgTls {
    let mode = url
        .split_once('?')
        .map(|(_, query)| query)
        .unwrap_or("")
        .split('&')
        .find_map(|pair| pair.strip_prefix("sslmode="));
    match mode {
        Some("require" | "prefer" | "allow" | "no-verify") => PgTls::Unverified,
        Some("verify-ca" | "verify-full") => PgTls::Verified,
        _ => PgTls::Disabled,
    }
}

/// Replace any `sslmode` query parameter with one both wire clients accept.
fn with_sslmode(url: &str, tls: PgTls) -> String {
    let (base, query) = url.split_once('?').unwrap_or((url, ""));
    let mut pairs: Vec<&str> = query
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("sslmode="))
        .collect();
    let mode = match tls {
        PgTls::Disabled => "sslmode=disable",
        PgTls::Unverified | PgTls::Verified => "sslmode=require",
    };
    pairs.push(mode);
    format!("{base}?{}", pairs.join("&"))
}

fn key_values(
    host: &str,
    port: Option<u16>,
    user: Option<&str>,
    password: Option<&str>,
    database: &str,
    tls: PgTls,
) -> String {
    let mut parts = vec![format!("host={}", quote(host))];
    if let Some(port) = port {
        parts.push(format!("port={port}"));
    }
    if let Some(user) = user {
        parts.push(format!("user={}", quote(user)));
    }
    if let Some(password) = password {
        parts.push(format!("password={}", quote(password)));
    }
    parts.push(format!("dbname={}", quote(database)));
    parts.push(
        match tls {
            PgTls::Disabled => "sslmode=disable",
            PgTls::Unverified | PgTls::Verified => "sslmode=require",
        }
        .to_string(),
    );
    parts.join(" ")
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Both clients refuse to connect without a user; fall back the way libpq does.
fn default_user() -> Option<String> {
    std::env::var("PGUSER")
        .or_else(|_| std::env::var("USER"))
        .ok()
        .or_else(|| Some("postgres".to_string()))
}

// ============================================================================
// TLS
// ============================================================================

#[cfg(any(feature = "postgres-sync", feature = "tokio-postgres", feature = "gel"))]
fn tls_connector(tls: PgTls) -> Result<Option<postgres_native_tls::MakeTlsConnector>> {
    let mut builder = native_tls::TlsConnector::builder();
    match tls {
        PgTls::Disabled => return Ok(None),
        PgTls::Unverified => {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        PgTls::Verified => {}
    }
    let connector = builder
        .build()
        .map_err(|e| Error::Connection(format!("Failed to build TLS connector: {}", e)))?;
    Ok(Some(postgres_native_tls::MakeTlsConnector::new(connector)))
}

// ============================================================================
// postgres (sync)
// ============================================================================

#[cfg(feature = "postgres-sync")]
struct SyncClient {
    client: postgres::Client,
}

#[cfg(feature = "postgres-sync")]
pub(super) fn open_sync(creds: &PostgresCredentials) -> Result<Box<dyn Client>> {
    let plan = postgres_plan(creds)?;
    let config: postgres::Config = plan
        .params
        .parse()
        .map_err(|e| Error::Connection(format!("Invalid PostgreSQL connection string: {}", e)))?;

    let client = match tls_connector(plan.tls)? {
        Some(tls) => config.connect(tls),
        None => config.connect(postgres::NoTls),
    }
    .map_err(|e| {
        Error::Connection(format!("Failed to connect to PostgreSQL at {}: {}", plan.display, e))
    })?;

    Ok(Box::new(SyncClient { client }))
}

#[cfg(feature = "postgres-sync")]
impl Client for SyncClient {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.client
            .batch_execute(sql)
            .map_err(|e| Error::query(sql, e))
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        let messages = self
            .client
            .simple_query(sql)
            .map_err(|e| Error::query(sql, e))?;
        Ok(messages
            .iter()
            .filter_map(|m| match m {
                postgres::SimpleQueryMessage::Row(row) => {
                    Some(row.get(0).unwrap_or_default().to_string())
                }
                _ => None,
            })
            .collect())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.client
            .close()
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

// ============================================================================
// tokio-postgres (also Gel)
// ============================================================================

#[cfg(any(feature = "tokio-postgres", feature = "gel"))]
struct AsyncClient {
    rt: tokio::runtime::Runtime,
    client: tokio_postgres::Client,
}

#[cfg(any(feature = "tokio-postgres", feature = "gel"))]
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Connection(format!("Failed to create async runtime: {}", e)))
}

#[cfg(any(feature = "tokio-postgres", feature = "gel"))]
async fn connect_with<T>(
    config: &tokio_postgres::Config,
    tls: T,
) -> std::result::Result<tokio_postgres::Client, tokio_postgres::Error>
where
    T: tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket>,
    T::Stream: Send + 'static,
{
    let (client, connection) = config.connect(tls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(error = %e, "PostgreSQL connection error");
        }
    });
    Ok(client)
}

#[cfg(any(feature = "tokio-postgres", feature = "gel"))]
fn open_plan_async(plan: ConnectPlan, label: &str) -> Result<Box<dyn Client>> {
    let config: tokio_postgres::Config = plan
        .params
        .parse()
        .map_err(|e| Error::Connection(format!("Invalid {label} connection string: {}", e)))?;
    let rt = runtime()?;
    let tls = tls_connector(plan.tls)?;

    let client = rt
        .block_on(async {
            match tls {
                Some(tls) => connect_with(&config, tls).await,
                None => connect_with(&config, tokio_postgres::NoTls).await,
            }
        })
        .map_err(|e| {
            Error::Connection(format!("Failed to connect to {label} at {}: {}", plan.display, e))
        })?;

    Ok(Box::new(AsyncClient { rt, client }))
}

#[cfg(feature = "tokio-postgres")]
pub(super) fn open_async(creds: &PostgresCredentials) -> Result<Box<dyn Client>> {
    open_plan_async(postgres_plan(creds)?, "PostgreSQL")
}

#[cfg(feature = "gel")]
pub(super) fn open_gel(creds: &GelCredentials) -> Result<Box<dyn Client>> {
    open_plan_async(gel_plan(creds), "Gel")
}

#[cfg(any(feature = "tokio-postgres", feature = "gel"))]
impl Client for AsyncClient {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.rt
            .block_on(self.client.batch_execute(sql))
            .map_err(|e| Error::query(sql, e))
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        let messages = self
            .rt
            .block_on(self.client.simple_query(sql))
            .map_err(|e| Error::query(sql, e))?;
        Ok(messages
            .iter()
            .filter_map(|m| match m {
                tokio_postgres::SimpleQueryMessage::Row(row) => {
                    Some(row.get(0).unwrap_or_default().to_string())
                }
                _ => None,
            })
            .collect())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let AsyncClient { rt, client } = *self;
        drop(client);
        drop(rt);
        Ok(())
    }
}

// ============================================================================
// AWS RDS Data API
// ============================================================================

#[cfg(feature = "aws-data-api")]
struct DataApiClient {
    rt: tokio::runtime::Runtime,
    client: aws_sdk_rdsdata::Client,
    database: String,
    secret_arn: String,
    resource_arn: String,
}

#[cfg(feature = "aws-data-api")]
pub(super) fn open_data_api(
    database: &str,
    secret_arn: &str,
    resource_arn: &str,
) -> Result<Box<dyn Client>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Connection(format!("Failed to create async runtime: {}", e)))?;
    let sdk_config = rt.block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));

    Ok(Box::new(DataApiClient {
        rt,
        client: aws_sdk_rdsdata::Client::new(&sdk_config),
        database: database.to_string(),
        secret_arn: secret_arn.to_string(),
        resource_arn: resource_arn.to_string(),
    }))
}

#[cfg(feature = "aws-data-api")]
impl DataApiClient {
    fn run(&self, sql: &str) -> Result<aws_sdk_rdsdata::operation::execute_statement::ExecuteStatementOutput> {
        self.rt
            .block_on(
                self.client
                    .execute_statement()
                    .resource_arn(&self.resource_arn)
                    .secret_arn(&self.secret_arn)
                    .database(&self.database)
                    .sql(sql)
                    .send(),
            )
            .map_err(|e| Error::query(sql, aws_sdk_rdsdata::error::DisplayErrorContext(&e)))
    }
}

#[cfg(feature = "aws-data-api")]
impl Client for DataApiClient {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.run(sql).map(drop)
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        use aws_sdk_rdsdata::types::Field;

        let output = self.run(sql)?;
        Ok(output
            .records()
            .iter()
            .map(|record| match record.first() {
                Some(Field::StringValue(s)) => s.clone(),
                Some(Field::LongValue(i)) => i.to_string(),
                Some(Field::DoubleValue(d)) => d.to_string(),
                Some(Field::BooleanValue(b)) => b.to_string(),
                _ => String::new(),
            })
            .collect())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
