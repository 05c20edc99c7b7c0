//! Error types shared by the configuration, driver and operation layers.

use std::path::PathBuf;

use crate::config::Dialect;
use crate::driver::DriverKind;

/// Errors produced while resolving a configuration or talking to a database.
///
/// Operation executors never return these to their callers; they are folded
/// into the `error`/`message` field of the operation's result value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No dialect/driver variant matches the configuration.
    #[error("unsupported configuration: {config}")]
    UnsupportedConfiguration { config: String },

    /// A variant matched but its required fields are missing or malformed.
    #[error("invalid {dialect} configuration: {reason}")]
    InvalidConfiguration { dialect: Dialect, reason: String },

    /// The driver is recognized but cannot be used from this tool.
    #[error("driver '{driver}' is not supported: {reason}")]
    DriverNotSupported { driver: String, reason: String },

    /// None of the drivers for the dialect were compiled in.
    #[error(
        "no {dialect} driver available; rebuild with one of: {}",
        describe_attempted(.attempted)
    )]
    NoDriverAvailable {
        dialect: Dialect,
        attempted: Vec<DriverKind>,
    },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("statement failed: {message}\n{sql}")]
    Query { sql: String, message: String },

    #[error("seed file not found: {}", .0.display())]
    SeedNotFound(PathBuf),

    #[error(
        "seed file {} must export one of: {}",
        .path.display(),
        .tried.join(", ")
    )]
    SeedEntryPointMissing {
        path: PathBuf,
        tried: &'static [&'static str],
    },

    #[error("seed failed: {0}")]
    Seed(String),

    #[error("config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    ConfigIo(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    ConfigParse(PathBuf, String),

    #[error("environment variable '{var}' referenced in {} is not set", .path.display())]
    MissingEnvVar { var: String, path: PathBuf },

    #[error("{0}")]
    Toolkit(String),
}

impl Error {
    pub(crate) fn query(sql: &str, err: impl std::fmt::Display) -> Self {
        Self::Query {
            sql: sql.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid(dialect: Dialect, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            dialect,
            reason: reason.into(),
        }
    }
}

fn describe_attempted(attempted: &[DriverKind]) -> String {
    attempted
        .iter()
        .map(|d| format!("'{}' (feature \"{}\")", d.name(), d.feature()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
