//! drizzle-kit subprocess and the refresh workflow
//!
//! Migration generation and application stay in drizzle-kit; this module
//! only shells out to it with the resolved config path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::ops::ResetResult;

/// drizzle-kit commands forwarded unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KitCommand {
    Generate,
    Migrate,
    Push,
    Pull,
    Studio,
    /// Removes a migration from the migrations folder; never touches the database.
    Drop,
}

impl KitCommand {
    pub const ALL: &'static [KitCommand] = &[
        Self::Generate,
        Self::Migrate,
        Self::Push,
        Self::Pull,
        Self::Studio,
        Self::Drop,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Migrate => "migrate",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Studio => "studio",
            Self::Drop => "drop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for KitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can run a drizzle-kit command to completion.
pub trait Kit {
    fn run(&self, command: KitCommand) -> Result<()>;
}

/// `npx drizzle-kit <command> --config=<path>`, stdio inherited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolkit {
    program: String,
    args: Vec<String>,
    config: PathBuf,
}

impl Toolkit {
    pub fn new(config: impl Into<PathBuf>) -> Self {
        Self::with_program("npx", ["drizzle-kit"], config)
    }

    pub fn with_program<I, S>(program: impl Into<String>, args: I, config: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            config: config.into(),
        }
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    /// Full command line for `command`, for display.
    pub fn command_line(&self, command: KitCommand) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(command.as_str().to_string());
        parts.push(self.config_flag());
        parts.join(" ")
    }

    /// Check that drizzle-kit can be started at all.
    pub fn validate(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(Error::Toolkit(format!(
                "drizzle-kit is not available ({}); install it with `npm install -D drizzle-kit`",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn config_flag(&self) -> String {
        format!("--config={}", self.config.display())
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::Toolkit(format!("failed to start '{}': {e}", self.program))
    }
}

impl Kit for Toolkit {
    fn run(&self, command: KitCommand) -> Result<()> {
        tracing::debug!(command = %self.command_line(command), "toolkit.run");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(command.as_str())
            .arg(self.config_flag())
            .status()
            .map_err(|e| self.spawn_error(e))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Toolkit(format!("drizzle-kit {command} failed ({status})")))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStep {
    Drop,
    Generate,
    Reset,
    Migrate,
}

impl RefreshStep {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Generate => "generate",
            Self::Reset => "reset",
            Self::Migrate => "migrate",
        }
    }
}

impl fmt::Display for RefreshStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const REFRESH_STEPS: [RefreshStep; 4] = [
    RefreshStep::Drop,
    RefreshStep::Generate,
    RefreshStep::Reset,
    RefreshStep::Migrate,
];

/// A refresh that stopped before its last step.
#[derive(Debug, thiserror::Error)]
#[error("refresh stopped at {step}: {source}")]
pub struct RefreshFailure {
    pub step: RefreshStep,
    pub source: Error,
    /// Set when the reset step itself failed; may list tables already dropped.
    pub reset: Option<ResetResult>,
}

impl From<RefreshFailure> for Error {
    fn from(failure: RefreshFailure) -> Self {
        Error::Toolkit(failure.to_string())
    }
}

/// drop -> generate -> reset -> migrate, stopping at the first failure.
///
/// `reset` is called for the reset step; every other step goes to `kit`.
/// `on_step` is told about each step before it runs. The reset result is
/// returned so callers can report the dropped tables, including on failure.
pub fn refresh(
    kit: &dyn Kit,
    reset: impl FnOnce() -> ResetResult,
    mut on_step: impl FnMut(RefreshStep),
) -> std::result::Result<ResetResult, RefreshFailure> {
    let mut reset = Some(reset);
    let mut outcome = ResetResult::default();

    for step in REFRESH_STEPS {
        on_step(step);
        let result = match step {
            RefreshStep::Drop => kit.run(KitCommand::Drop),
            RefreshStep::Generate => kit.run(KitCommand::Generate),
            RefreshStep::Migrate => kit.run(KitCommand::Migrate),
            RefreshStep::Reset => {
                let run = reset.take().map(|f| f()).unwrap_or_default();
                if !run.success {
                    let source = Error::Toolkit(
                        run.error.clone().unwrap_or_else(|| "database reset failed".to_string()),
                    );
                    tracing::debug!(step = %step, dropped = run.tables_dropped.len(), "refresh aborted");
                    return Err(RefreshFailure {
                        step,
                        source,
                        reset: Some(run),
                    });
                }
                outcome = run;
                Ok(())
            }
        };
        if let Err(source) = result {
            tracing::debug!(step = %step, error = %source, "refresh aborted");
            return Err(RefreshFailure {
                step,
                source,
                reset: None,
            });
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordingKit {
        ran: RefCell<Vec<KitCommand>>,
        fail: Option<KitCommand>,
    }

    impl Kit for RecordingKit {
        fn run(&self, command: KitCommand) -> Result<()> {
            self.ran.borrow_mut().push(command);
            if self.fail == Some(command) {
                return Err(Error::Toolkit(format!("drizzle-kit {command} failed")));
            }
            Ok(())
        }
    }

    fn dropped(tables: &[&str]) -> ResetResult {
        ResetResult {
            success: true,
            tables_dropped: tables.iter().map(|t| t.to_string()).collect(),
            error: None,
        }
    }

    #[test]
    fn steps_run_in_order() {
        let kit = RecordingKit::default();
        let mut seen = Vec::new();
        let result = refresh(&kit, || dropped(&["users"]), |s| seen.push(s)).unwrap();

        assert_eq!(seen, REFRESH_STEPS);
        assert_eq!(*kit.ran.borrow(), [KitCommand::Drop, KitCommand::Generate, KitCommand::Migrate]);
        assert_eq!(result.tables_dropped, ["users"]);
    }

    #[test]
    fn generate_failure_skips_reset() {
        let kit = RecordingKit {
            fail: Some(KitCommand::Generate),
            ..Default::default()
        };
        let mut reset_called = false;
        let err = refresh(
            &kit,
            || {
                reset_called = true;
                dropped(&[])
            },
            |_| {},
        )
        .unwrap_err();

        assert!(err.to_string().contains("refresh stopped at generate"));
        assert!(!reset_called);
        assert_eq!(*kit.ran.borrow(), [KitCommand::Drop, KitCommand::Generate]);
    }

    #[test]
    fn failed_reset_skips_migrate() {
        let kit = RecordingKit::default();
        let err = refresh(
            &kit,
            || ResetResult {
                success: false,
                tables_dropped: Vec::new(),
                error: Some("connection refused".into()),
            },
            |_| {},
        )
        .unwrap_err();

        assert!(err.to_string().contains("stopped at reset: connection refused"));
        assert_eq!(err.step, RefreshStep::Reset);
        assert!(!kit.ran.borrow().contains(&KitCommand::Migrate));
    }

    #[test]
    fn partial_reset_is_kept_on_failure() {
        let kit = RecordingKit::default();
        let err = refresh(
            &kit,
            || ResetResult {
                success: false,
                tables_dropped: vec!["posts".into(), "users".into()],
                error: Some("cannot drop table \"orders\"".into()),
            },
            |_| {},
        )
        .unwrap_err();

        let reset = err.reset.as_ref().unwrap();
        assert!(!reset.success);
        assert_eq!(reset.tables_dropped, ["posts", "users"]);

        let err = Error::from(err);
        assert!(matches!(err, Error::Toolkit(msg) if msg.contains("orders")));
    }

    #[test]
    fn kit_failure_has_no_reset_result() {
        let kit = RecordingKit {
            fail: Some(KitCommand::Migrate),
            ..Default::default()
        };
        let err = refresh(&kit, || dropped(&["users"]), |_| {}).unwrap_err();
        assert_eq!(err.step, RefreshStep::Migrate);
        assert!(err.reset.is_none());
    }

    #[test]
    fn command_line_carries_config() {
        let kit = Toolkit::new("drizzle.config.ts");
        assert_eq!(
            kit.command_line(KitCommand::Push),
            "npx drizzle-kit push --config=drizzle.config.ts"
        );
        assert_eq!(KitCommand::parse("studio"), Some(KitCommand::Studio));
        assert_eq!(KitCommand::parse("reset"), None);
    }

    #[test]
    fn missing_program_is_a_toolkit_error() {
        let kit = Toolkit::with_program("db-ops-no-such-program", Vec::<String>::new(), "x.toml");
        let err = kit.run(KitCommand::Generate).unwrap_err();
        assert!(matches!(err, Error::Toolkit(msg) if msg.contains("failed to start")));
        assert!(kit.validate().is_err());
    }
}
