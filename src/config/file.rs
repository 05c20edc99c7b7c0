//! Configuration files
//!
//! Two kinds of file are understood:
//!
//! - `db.config.toml`, which points at the drizzle-kit config and optionally a
//!   seed file,
//! - the drizzle-kit config itself (`drizzle.config.toml`, `.json`, or a
//!   script such as `drizzle.config.ts` evaluated through [`ScriptRunner`]).
//!
//! String values in the drizzle-kit config may reference environment
//! variables as `${VAR}`; they are substituted after loading.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::DatabaseConfig;
use crate::error::{Error, Result};
use crate::script::{self, ScriptRunner};

/// Default db config file name
pub const DB_CONFIG_FILE: &str = "db.config.toml";

/// Files tried, in order, when no path is given.
pub const DISCOVERY_ORDER: &[&str] = &[
    DB_CONFIG_FILE,
    "drizzle.config.toml",
    "drizzle.config.json",
    "drizzle.config.ts",
    "drizzle.config.js",
    "drizzle.config.mjs",
    "drizzle.config.cjs",
];

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env reference pattern")
});

/// Contents of `db.config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfig {
    /// Path to the drizzle-kit config file
    pub drizzle_config: PathBuf,
    /// Optional seed file used by `seed`
    #[serde(default)]
    pub seed: Option<PathBuf>,
}

impl DbConfig {
    /// Load and validate a `db.config.toml`.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = read(path)?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(path.into(), e.to_string()))?;

        if config.drizzle_config.as_os_str().is_empty() {
            return Err(Error::ConfigParse(
                path.into(),
                "missing required 'drizzleConfig' field".into(),
            ));
        }

        let base = path.parent().unwrap_or(Path::new(""));
        config.drizzle_config = base.join(&config.drizzle_config);
        config.seed = config.seed.map(|s| base.join(s));
        Ok(config)
    }
}

impl DbConfig {
    /// Treat `path` as a `db.config.toml` when its name says so, otherwise as
    /// the drizzle-kit config itself. The drizzle-kit config is not read.
    pub fn resolve(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.into()));
        }
        if is_db_config(path) {
            Self::load_from(path)
        } else {
            Ok(Self {
                drizzle_config: path.to_path_buf(),
                seed: None,
            })
        }
    }

    /// [`DbConfig::resolve`] on the first file of [`DISCOVERY_ORDER`] in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = discover(dir).ok_or_else(|| Error::ConfigNotFound(dir.join(DB_CONFIG_FILE)))?;
        Self::resolve(&path)
    }
}

/// A fully loaded configuration: db config, drizzle-kit config path, the raw
/// document and its narrowed form.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub db: DbConfig,
    pub drizzle_config_path: PathBuf,
    pub raw: Value,
    pub database: DatabaseConfig,
}

impl ResolvedConfig {
    /// Discover a config file in `dir` and load it.
    pub fn discover(dir: &Path, runner: &ScriptRunner) -> Result<Self> {
        Self::from_db(DbConfig::discover(dir)?, runner)
    }

    /// Load either a `db.config.toml` or a drizzle-kit config directly.
    pub fn load(path: &Path, runner: &ScriptRunner) -> Result<Self> {
        Self::from_db(DbConfig::resolve(path)?, runner)
    }

    /// Read and narrow the drizzle-kit config a [`DbConfig`] points at.
    pub fn from_db(db: DbConfig, runner: &ScriptRunner) -> Result<Self> {
        let drizzle_config_path = db.drizzle_config.clone();
        let raw = load_drizzle_config(&drizzle_config_path, runner)?;
        let database = DatabaseConfig::from_value(&raw)?;

        tracing::debug!(
            config = %drizzle_config_path.display(),
            dialect = %database.dialect(),
            "config.loaded"
        );

        Ok(Self {
            db,
            drizzle_config_path,
            raw,
            database,
        })
    }
}

/// First existing file of [`DISCOVERY_ORDER`] in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DISCOVERY_ORDER
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

fn is_db_config(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("db.config"))
}

/// Load a drizzle-kit config as a JSON document with `${VAR}` substituted.
pub fn load_drizzle_config(path: &Path, runner: &ScriptRunner) -> Result<Value> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.into()));
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut value = match ext {
        "toml" => toml::from_str::<Value>(&read(path)?)
            .map_err(|e| Error::ConfigParse(path.into(), e.to_string()))?,
        "json" => serde_json::from_str::<Value>(&read(path)?)
            .map_err(|e| Error::ConfigParse(path.into(), e.to_string()))?,
        _ if script::is_script(path) => runner.eval_default(path)?,
        _ => {
            return Err(Error::ConfigParse(
                path.into(),
                format!("unsupported config format '{ext}'"),
            ));
        }
    };

    substitute_env(&mut value, path, |name| std::env::var(name).ok())?;
    Ok(value)
}

/// Replace `${VAR}` references in every string of `value`.
pub fn substitute_env<F>(value: &mut Value, path: &Path, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String> + Copy,
{
    match value {
        Value::String(s) if s.contains("${") => {
            let mut out = String::with_capacity(s.len());
            let mut last = 0;
            for caps in ENV_REF.captures_iter(s) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let resolved = lookup(name.as_str()).ok_or_else(|| Error::MissingEnvVar {
                    var: name.as_str().to_string(),
                    path: path.into(),
                })?;
                out.push_str(&s[last..whole.start()]);
                out.push_str(&resolved);
                last = whole.end();
            }
            out.push_str(&s[last..]);
            *s = out;
        }
        Value::Array(items) => {
            for item in items {
                substitute_env(item, path, lookup)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_env(item, path, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ConfigNotFound(path.into())
        } else {
            Error::ConfigIo(path.into(), e)
        }
    })
}
