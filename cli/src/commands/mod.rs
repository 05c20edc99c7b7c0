//! CLI command implementations
//!
//! Each command module implements one `db` subcommand.

pub mod health;
pub mod kit;
pub mod list;
pub mod refresh;
pub mod reset;
pub mod seed;
pub mod truncate;

use std::path::{Path, PathBuf};

use db_ops::config::file::{DbConfig, ResolvedConfig};
use db_ops::safety::{Confirm, DestructiveAction, Environment, Gate, require_confirmation};
use db_ops::script::ScriptRunner;
use db_ops::toolkit::Toolkit;
use serde::Serialize;

use crate::error::CliError;
use crate::output;

/// Everything a command needs once the environment is loaded.
#[derive(Debug)]
pub struct Context {
    pub env: Environment,
    pub db: DbConfig,
    pub runner: ScriptRunner,
    pub json: bool,
}

impl Context {
    /// Resolve `--config`, or discover a config file in `dir`.
    pub fn new(env: Environment, config: Option<&Path>, dir: &Path, json: bool) -> Result<Self, CliError> {
        let db = match config {
            Some(path) => DbConfig::resolve(path)?,
            None => DbConfig::discover(dir)?,
        };
        Ok(Self {
            env,
            db,
            runner: ScriptRunner::default(),
            json,
        })
    }

    /// Read the drizzle-kit config and print which one is in use.
    pub fn load(&self) -> Result<ResolvedConfig, CliError> {
        let resolved = ResolvedConfig::from_db(self.db.clone(), &self.runner)?;
        self.say(format!(
            "{} {} {}",
            output::label("Using config:"),
            resolved.drizzle_config_path.display(),
            output::muted(&format!("(dialect: {}, env: {})", resolved.database.dialect(), self.env)),
        ));
        Ok(resolved)
    }

    pub fn toolkit(&self) -> Toolkit {
        Toolkit::new(self.db.drizzle_config.clone())
    }

    pub fn seed_file(&self) -> Option<&PathBuf> {
        self.db.seed.as_ref()
    }

    /// Print a human-readable line; silent under `--json`.
    pub fn say(&self, line: impl AsRef<str>) {
        if !self.json {
            println!("{}", line.as_ref());
        }
    }

    /// Print `value` as JSON under `--json`.
    pub fn emit<T: Serialize>(&self, value: &T) -> Result<(), CliError> {
        if self.json {
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| CliError::IoError(format!("failed to encode result: {e}")))?;
            println!("{text}");
        }
        Ok(())
    }

    /// Production gate. Prints the cancellation notice when declined.
    pub fn confirm(
        &self,
        action: DestructiveAction,
        resolved: &ResolvedConfig,
        confirm: &mut dyn Confirm,
    ) -> Result<Gate, CliError> {
        let target = resolved.database.dialect().to_string();
        let gate = require_confirmation(self.env, action, &target, confirm)?;
        if gate == Gate::Declined {
            eprintln!("{}", output::warning("Operation canceled."));
        }
        Ok(gate)
    }
}
