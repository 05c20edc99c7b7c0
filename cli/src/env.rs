//! Target environment selection and `.env.<name>` loading

use std::path::{Path, PathBuf};

use db_ops::safety::Environment;

use crate::error::CliError;
use crate::{output, prompt};

/// Environment from `--env`, or asked for on a terminal.
///
/// Without a terminal the flag is required.
pub fn resolve(flag: Option<&str>, interactive: bool) -> Result<Environment, CliError> {
    match flag {
        Some(name) => Environment::parse(name).ok_or_else(|| CliError::InvalidEnvironment {
            given: name.to_string(),
            expected: names(),
        }),
        None if interactive => prompt::select_environment(),
        None => Err(CliError::EnvironmentRequired(names().replace(", ", "|"))),
    }
}

/// Load `.env.<name>` from `dir`, overriding variables already set.
///
/// A missing file only warns. Returns the path that was loaded.
pub fn load(env: Environment, dir: &Path) -> Result<Option<PathBuf>, CliError> {
    let path = env.env_path(dir);
    if !path.is_file() {
        eprintln!(
            "{}",
            output::warn_line(&format!("Environment file not found: {}", path.display()))
        );
        return Ok(None);
    }

    dotenvy::from_path_override(&path)
        .map_err(|e| CliError::IoError(format!("failed to load {}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "env.loaded");
    Ok(Some(path))
}

fn names() -> String {
    Environment::ALL
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins() {
        assert_eq!(resolve(Some("staging"), false).unwrap(), Environment::Staging);
    }

    #[test]
    fn unknown_flag_lists_choices() {
        let err = resolve(Some("production"), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown environment 'production', expected one of: dev, test, staging, prod"
        );
    }

    #[test]
    fn required_without_terminal() {
        let err = resolve(None, false).unwrap_err();
        assert!(matches!(err, CliError::EnvironmentRequired(_)));
        assert!(err.to_string().contains("--env <dev|test|staging|prod>"));
    }

    #[test]
    fn env_file_overrides_process_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env.test"),
            "DB_OPS_CLI_ENV_FILE_PROBE=from-file\n",
        )
        .unwrap();
        // SAFETY: only this test touches this variable.
        unsafe { std::env::set_var("DB_OPS_CLI_ENV_FILE_PROBE", "from-process") };

        let loaded = load(Environment::Test, dir.path()).unwrap();
        assert_eq!(loaded, Some(dir.path().join(".env.test")));
        assert_eq!(std::env::var("DB_OPS_CLI_ENV_FILE_PROBE").unwrap(), "from-file");
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(Environment::Prod, dir.path()).unwrap(), None);
    }
}
