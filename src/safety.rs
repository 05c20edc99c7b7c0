//! Target environments and the production confirmation gate

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Word the operator must type to run a destructive command against `prod`.
pub const CONFIRM_WORD: &str = "CONFIRM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub const ALL: &'static [Environment] = &[Self::Dev, Self::Test, Self::Staging, Self::Prod];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|env| env.as_str() == s)
    }

    /// `.env.<name>` file holding this environment's variables
    pub fn env_file(&self) -> String {
        format!(".env.{}", self.as_str())
    }

    /// Path of the `.env.<name>` file inside `dir`
    pub fn env_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.env_file())
    }

    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands that destroy data and are gated in production
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveAction {
    Reset,
    Truncate,
    Refresh,
}

impl DestructiveAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Truncate => "truncate",
            Self::Refresh => "refresh",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Reset => "drop every table",
            Self::Truncate => "delete every row",
            Self::Refresh => "drop, regenerate and re-migrate the schema",
        }
    }
}

/// Source of a typed answer, usually an interactive prompt.
pub trait Confirm {
    /// Ask `prompt` and return what the operator typed.
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> Result<String>,
{
    fn ask(&mut self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Declined,
}

impl Gate {
    pub const fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Prompt text shown before a destructive production command.
pub fn confirmation_prompt(action: DestructiveAction, target: &str) -> String {
    format!(
        "You are about to {} ({}) on PRODUCTION database {target}. Type {CONFIRM_WORD} to continue:",
        action.as_str().to_uppercase(),
        action.describe(),
    )
}

/// Outside `prod` every action proceeds without asking. In `prod` the answer
/// must be exactly [`CONFIRM_WORD`] after trimming; anything else declines.
pub fn require_confirmation(
    env: Environment,
    action: DestructiveAction,
    target: &str,
    confirm: &mut dyn Confirm,
) -> Result<Gate> {
    if !env.is_production() {
        return Ok(Gate::Proceed);
    }

    let answer = confirm.ask(&confirmation_prompt(action, target))?;
    if answer.trim() == CONFIRM_WORD {
        tracing::info!(action = action.as_str(), "production action confirmed");
        Ok(Gate::Proceed)
    } else {
        tracing::info!(action = action.as_str(), "production action declined");
        Ok(Gate::Declined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn environment_names_round_trip() {
        for env in Environment::ALL {
            assert_eq!(Environment::parse(env.as_str()), Some(*env));
        }
        assert_eq!(Environment::parse("production"), None);
        assert_eq!(Environment::Staging.env_file(), ".env.staging");
        assert_eq!(
            Environment::Dev.env_path(Path::new("/app")),
            PathBuf::from("/app/.env.dev")
        );
    }

    #[test]
    fn non_production_never_asks() {
        let mut asked = false;
        let mut confirm = |_: &str| -> Result<String> {
            asked = true;
            Ok(String::new())
        };
        for env in [Environment::Dev, Environment::Test, Environment::Staging] {
            let gate = require_confirmation(env, DestructiveAction::Reset, "app", &mut confirm).unwrap();
            assert_eq!(gate, Gate::Proceed);
        }
        assert!(!asked);
    }

    #[test]
    fn production_requires_exact_word() {
        let typed = |answer: &'static str| {
            move |_: &str| -> Result<String> { Ok(answer.to_string()) }
        };

        let gate = require_confirmation(
            Environment::Prod,
            DestructiveAction::Truncate,
            "app",
            &mut typed("  CONFIRM\n"),
        )
        .unwrap();
        assert!(gate.is_proceed());

        for answer in ["confirm", "yes", "", "CONFIRMED"] {
            let gate =
                require_confirmation(Environment::Prod, DestructiveAction::Refresh, "app", &mut typed(answer))
                    .unwrap();
            assert_eq!(gate, Gate::Declined, "{answer:?}");
        }
    }

    #[test]
    fn prompt_failure_propagates() {
        let mut broken = |_: &str| -> Result<String> { Err(Error::Toolkit("no terminal".into())) };
        let err = require_confirmation(Environment::Prod, DestructiveAction::Reset, "app", &mut broken)
            .unwrap_err();
        assert!(err.to_string().contains("no terminal"));
    }

    #[test]
    fn prompt_names_action_and_target() {
        let prompt = confirmation_prompt(DestructiveAction::Reset, "postgresql");
        assert!(prompt.contains("RESET"));
        assert!(prompt.contains("postgresql"));
        assert!(prompt.contains(CONFIRM_WORD));
    }
}
