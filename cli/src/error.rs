//! Error types for the CLI

use thiserror::Error;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration, driver or toolkit error from the library
    #[error(transparent)]
    Db(#[from] db_ops::Error),

    /// An operation ran and reported failure; its result has been printed
    #[error("{0}")]
    Failed(String),

    /// No `--env` given and no terminal to ask on
    #[error("an environment is required: pass --env <{0}>")]
    EnvironmentRequired(String),

    #[error("unknown environment '{given}', expected one of: {expected}")]
    InvalidEnvironment { given: String, expected: String },

    /// Interactive prompt failed or was interrupted
    #[error("Prompt cancelled: {0}")]
    Prompt(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}
