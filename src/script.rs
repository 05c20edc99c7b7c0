//! External script interpreter
//!
//! TypeScript/JavaScript files (drizzle configs written as `.ts`, script
//! seeds) cannot be evaluated in-process. They are handed to an external
//! interpreter, `npx tsx` by default, through a short bootstrap program that
//! receives the module path in an environment variable.

use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

use crate::error::{Error, Result};

/// Environment variable carrying the absolute module path into the bootstrap.
const MODULE_VAR: &str = "DB_OPS_MODULE";
/// Environment variable carrying the export to invoke.
const EXPORT_VAR: &str = "DB_OPS_EXPORT";

/// Extensions evaluated through the interpreter.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "mts", "cts", "js", "mjs", "cjs"];

const LOAD_MODULE: &str = r#"
const { pathToFileURL } = require('node:url');
const load = () => import(pathToFileURL(process.env.DB_OPS_MODULE).href);
const fail = (e) => { console.error(e && e.message ? e.message : String(e)); process.exit(1); };
"#;

const EVAL_DEFAULT: &str = r#"
load().then((m) => {
  let c = m.default ?? m;
  if (c && c.default !== undefined) c = c.default;
  process.stdout.write(JSON.stringify(c));
}).catch(fail);
"#;

const LIST_EXPORTS: &str = r#"
load().then((m) => {
  const names = Object.keys(m).filter((k) => typeof m[k] === 'function');
  if (m.default && typeof m.default === 'object') {
    for (const k of Object.keys(m.default)) {
      if (typeof m.default[k] === 'function' && !names.includes(k)) names.push(k);
    }
  }
  process.stdout.write(JSON.stringify(names));
}).catch(fail);
"#;

const INVOKE_EXPORT: &str = r#"
load().then(async (m) => {
  const name = process.env.DB_OPS_EXPORT;
  let f = m[name];
  if (typeof f !== 'function' && m.default && typeof m.default === 'object') f = m.default[name];
  if (typeof f !== 'function') throw new Error(`export '${name}' is not a function`);
  await f();
  process.exit(0);
}).catch(fail);
"#;

/// Returns true when `path` has an extension handled by [`ScriptRunner`].
pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e))
}

/// Interpreter command line, e.g. `npx tsx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRunner {
    program: String,
    args: Vec<String>,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new("npx", ["tsx"])
    }
}

impl ScriptRunner {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Evaluate a module and return its default export as JSON.
    pub fn eval_default(&self, module: &Path) -> Result<Value> {
        let out = self
            .run(module, None, EVAL_DEFAULT, true)
            .map_err(|e| match e {
                Error::Seed(msg) => Error::ConfigParse(module.to_path_buf(), msg),
                other => other,
            })?;
        serde_json::from_str(&out).map_err(|e| {
            Error::ConfigParse(module.to_path_buf(), format!("module did not produce JSON: {e}"))
        })
    }

    /// Names of the function exports of a module.
    pub fn list_exports(&self, module: &Path) -> Result<Vec<String>> {
        let out = self.run(module, None, LIST_EXPORTS, true)?;
        serde_json::from_str(&out)
            .map_err(|e| Error::Seed(format!("could not read exports of {}: {e}", module.display())))
    }

    /// Call a zero-argument export and wait for it to settle.
    ///
    /// The script's own output goes straight to the terminal.
    pub fn invoke(&self, module: &Path, export: &str) -> Result<()> {
        self.run(module, Some(export), INVOKE_EXPORT, false).map(drop)
    }

    fn run(&self, module: &Path, export: Option<&str>, body: &str, capture: bool) -> Result<String> {
        let module = std::path::absolute(module).map_err(|e| Error::Seed(e.to_string()))?;
        let program = format!("{LOAD_MODULE}{body}");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("-e")
            .arg(&program)
            .env(MODULE_VAR, &module)
            .stdin(Stdio::null());
        if let Some(name) = export {
            cmd.env(EXPORT_VAR, name);
        }
        if capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        tracing::debug!(
            program = %self.program,
            module = %module.display(),
            export = export.unwrap_or(""),
            "script.run"
        );

        let output = cmd.output().map_err(|e| {
            Error::Toolkit(format!("failed to start '{}': {e}", self.program))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(Error::Seed(if detail.is_empty() {
                format!("{} exited with {}", module.display(), output.status)
            } else {
                detail.to_string()
            }));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_extensions() {
        assert!(is_script(Path::new("drizzle.config.ts")));
        assert!(is_script(Path::new("seed.mjs")));
        assert!(!is_script(Path::new("seed.sql")));
        assert!(!is_script(Path::new("drizzle.config.toml")));
        assert!(!is_script(Path::new("Makefile")));
    }

    #[test]
    fn default_runner_is_npx_tsx() {
        let runner = ScriptRunner::default();
        assert_eq!(runner.program(), "npx");
        assert_eq!(runner, ScriptRunner::new("npx", ["tsx"]));
    }

    #[test]
    fn missing_interpreter_is_reported() {
        let runner = ScriptRunner::new("db-ops-no-such-interpreter", Vec::<String>::new());
        let err = runner.list_exports(Path::new("seed.ts")).unwrap_err();
        assert!(matches!(err, Error::Toolkit(msg) if msg.contains("db-ops-no-such-interpreter")));
    }
}
