//! Seeding
//!
//! A seed file is loaded as a [`SeedModule`] exposing named entry points.
//! The first of [`ENTRY_POINTS`] the module exports is invoked.
//!
//! - `.sql` files are split into sections by `-- export: <name>` lines. Text
//!   before the first marker belongs to `default`; a file without markers
//!   exports only `default`. Each section runs as one batch on a fresh
//!   connection.
//! - Script files are run by an external interpreter and open their own
//!   connections.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::timestamp;
use crate::config::DatabaseConfig;
use crate::driver::DriverRegistry;
use crate::error::{Error, Result};
use crate::script::{self, ScriptRunner};

/// Entry points probed, in order.
pub const ENTRY_POINTS: &[&str] = &["default", "seed", "main"];

static EXPORT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--\s*export:\s*([A-Za-z_][A-Za-z0-9_-]*)\s*$").expect("valid export marker")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

/// A loaded seed file
pub trait SeedModule {
    /// Names of the callable exports
    fn exports(&self) -> Vec<String>;

    fn invoke(&mut self, name: &str) -> Result<()>;
}

/// Turns a seed file into a [`SeedModule`].
pub trait SeedLoader {
    fn handles(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> Result<Box<dyn SeedModule + '_>>;
}

// ============================================================================
// SQL seeds
// ============================================================================

/// Split a SQL seed into `(export, sql)` sections.
pub fn parse_sql_seed(text: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut current = "default".to_string();
    let mut body = String::new();

    for line in text.lines() {
        if let Some(caps) = EXPORT_MARKER.captures(line) {
            flush(&current, &mut body, &mut sections);
            current = caps[1].to_string();
            if !sections.iter().any(|(n, _)| *n == current) {
                sections.push((current.clone(), String::new()));
            }
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush(&current, &mut body, &mut sections);
    sections
}

/// True when `sql` has at least one line that is not blank or a `--` comment.
fn has_statements(sql: &str) -> bool {
    sql.lines().map(str::trim).any(|l| !l.is_empty() && !l.starts_with("--"))
}

fn flush(name: &str, body: &mut String, sections: &mut Vec<(String, String)>) {
    let sql = body.trim();
    if has_statements(sql) {
        match sections.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) if !existing.is_empty() => {
                existing.push('\n');
                existing.push_str(sql);
            }
            Some((_, existing)) => existing.push_str(sql),
            None => sections.push((name.to_string(), sql.to_string())),
        }
    }
    body.clear();
}

/// Loads `.sql` seeds and runs them against the configured database.
pub struct SqlSeedLoader<'a> {
    registry: &'a DriverRegistry,
    config: &'a DatabaseConfig,
}

impl<'a> SqlSeedLoader<'a> {
    pub fn new(registry: &'a DriverRegistry, config: &'a DatabaseConfig) -> Self {
        Self { registry, config }
    }
}

struct SqlSeedModule<'a> {
    sections: Vec<(String, String)>,
    registry: &'a DriverRegistry,
    config: &'a DatabaseConfig,
}

impl SeedLoader for SqlSeedLoader<'_> {
    fn handles(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e.eq_ignore_ascii_case("sql"))
    }

    fn load(&self, path: &Path) -> Result<Box<dyn SeedModule + '_>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Seed(format!("failed to read {}: {e}", path.display())))?;
        Ok(Box::new(SqlSeedModule {
            sections: parse_sql_seed(&text),
            registry: self.registry,
            config: self.config,
        }))
    }
}

impl SeedModule for SqlSeedModule<'_> {
    fn exports(&self) -> Vec<String> {
        self.sections
            .iter()
            .filter(|(_, sql)| !sql.is_empty())
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn invoke(&mut self, name: &str) -> Result<()> {
        let sql = self
            .sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sql)| sql.as_str())
            .ok_or_else(|| Error::Seed(format!("no export named '{name}'")))?;

        let mut conn = self.registry.connect(self.config)?;
        let result = conn.execute(sql);
        if let Err(e) = conn.close() {
            tracing::warn!(error = %e, "failed to close connection");
        }
        result
    }
}

// ============================================================================
// Script seeds
// ============================================================================

/// Loads script seeds through an external interpreter.
pub struct ScriptSeedLoader<'a> {
    runner: &'a ScriptRunner,
}

impl<'a> ScriptSeedLoader<'a> {
    pub fn new(runner: &'a ScriptRunner) -> Self {
        Self { runner }
    }
}

struct ScriptSeedModule<'a> {
    path: PathBuf,
    exports: Vec<String>,
    runner: &'a ScriptRunner,
}

impl SeedLoader for ScriptSeedLoader<'_> {
    fn handles(&self, path: &Path) -> bool {
        script::is_script(path)
    }

    fn load(&self, path: &Path) -> Result<Box<dyn SeedModule + '_>> {
        let exports = self.runner.list_exports(path)?;
        Ok(Box::new(ScriptSeedModule {
            path: path.to_path_buf(),
            exports,
            runner: self.runner,
        }))
    }
}

impl SeedModule for ScriptSeedModule<'_> {
    fn exports(&self) -> Vec<String> {
        self.exports.clone()
    }

    fn invoke(&mut self, name: &str) -> Result<()> {
        self.runner.invoke(&self.path, name)
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Run the seed at `path` with the compiled-in drivers and `npx tsx`.
pub fn seed_database(config: &DatabaseConfig, path: &Path) -> SeedResult {
    seed_database_with(&DriverRegistry::default(), &ScriptRunner::default(), config, path)
}

pub fn seed_database_with(
    registry: &DriverRegistry,
    runner: &ScriptRunner,
    config: &DatabaseConfig,
    path: &Path,
) -> SeedResult {
    let sql = SqlSeedLoader::new(registry, config);
    let scripts = ScriptSeedLoader::new(runner);
    let loaders: [&dyn SeedLoader; 2] = [&sql, &scripts];

    match run_seed(&loaders, path) {
        Ok(entry) => {
            tracing::info!(path = %path.display(), entry, "seed complete");
            SeedResult {
                success: true,
                message: Some(format!("Database seeded successfully from {}", path.display())),
                error: None,
                timestamp: timestamp(),
            }
        }
        Err(e) => SeedResult {
            success: false,
            message: None,
            error: Some(e.to_string()),
            timestamp: timestamp(),
        },
    }
}

fn run_seed(loaders: &[&dyn SeedLoader], path: &Path) -> Result<&'static str> {
    if !path.is_file() {
        return Err(Error::SeedNotFound(path.to_path_buf()));
    }

    let loader = loaders
        .iter()
        .find(|l| l.handles(path))
        .ok_or_else(|| Error::Seed(format!("unsupported seed file type: {}", path.display())))?;

    let mut module = loader.load(path)?;
    let exports = module.exports();
    let entry = ENTRY_POINTS
        .iter()
        .copied()
        .find(|e| exports.iter().any(|x| x == e))
        .ok_or_else(|| Error::SeedEntryPointMissing {
            path: path.to_path_buf(),
            tried: ENTRY_POINTS,
        })?;

    tracing::debug!(path = %path.display(), entry, "seed.invoke");
    module.invoke(entry)?;
    Ok(entry)
}
