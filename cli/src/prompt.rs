//! Interactive prompts

use std::io::{self, IsTerminal};

use db_ops::safety::{Confirm, Environment};
use inquire::error::InquireError;
use inquire::{Select, Text};

use crate::error::CliError;
use crate::output;

pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

pub fn select_environment() -> Result<Environment, CliError> {
    Select::new("Select the target environment (required):", Environment::ALL.to_vec())
        .with_starting_cursor(1)
        .prompt()
        .map_err(|e| CliError::Prompt(e.to_string()))
}

/// Typed confirmation on the terminal.
///
/// Anything that stops the operator from answering (no terminal, Esc,
/// Ctrl-C) reads as an empty answer, which declines.
#[derive(Debug, Default)]
pub struct TypedConfirm;

impl Confirm for TypedConfirm {
    fn ask(&mut self, prompt: &str) -> db_ops::Result<String> {
        eprintln!("{}", output::banner_production("This operation is destructive."));
        if !is_interactive() {
            eprintln!(
                "{}",
                output::warn_line("confirmation needs an interactive terminal")
            );
            return Ok(String::new());
        }

        match Text::new(prompt).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(String::new()),
            Err(e) => Err(db_ops::Error::Toolkit(format!("Prompt cancelled: {e}"))),
        }
    }
}
