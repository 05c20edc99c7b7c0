//! Truncate command implementation

use db_ops::ops::truncate_database;
use db_ops::safety::{Confirm, DestructiveAction, Gate};

use super::Context;
use crate::error::CliError;
use crate::output;

pub fn run(ctx: &Context, confirm: &mut dyn Confirm) -> Result<(), CliError> {
    let resolved = ctx.load()?;
    if ctx.confirm(DestructiveAction::Truncate, &resolved, confirm)? == Gate::Declined {
        return Ok(());
    }

    ctx.say(output::heading("Truncating database data..."));
    let result = truncate_database(&resolved.database);
    ctx.emit(&result)?;

    if !result.success {
        return Err(CliError::Failed(
            result.error.unwrap_or_else(|| "database truncate failed".into()),
        ));
    }

    ctx.say(format!(
        "{} truncated {}: {}",
        output::success("Database truncate complete,"),
        result.tables_truncated.len(),
        output::list(&result.tables_truncated)
    ));
    Ok(())
}
