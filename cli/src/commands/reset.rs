//! Reset command implementation
//!
//! Drops every non-allowlisted table. Gated in production.

use db_ops::ops::reset_database;
use db_ops::safety::{Confirm, DestructiveAction, Gate};

use super::Context;
use crate::error::CliError;
use crate::output;

pub fn run(ctx: &Context, confirm: &mut dyn Confirm) -> Result<(), CliError> {
    let resolved = ctx.load()?;
    if ctx.confirm(DestructiveAction::Reset, &resolved, confirm)? == Gate::Declined {
        return Ok(());
    }

    ctx.say(output::heading("Resetting database..."));
    let result = reset_database(&resolved.database);
    ctx.emit(&result)?;

    if !result.success {
        if !result.tables_dropped.is_empty() {
            ctx.say(format!(
                "  {} {}",
                output::warning("Dropped before failure:"),
                output::list(&result.tables_dropped)
            ));
        }
        return Err(CliError::Failed(
            result.error.unwrap_or_else(|| "database reset failed".into()),
        ));
    }

    ctx.say(format!(
        "{} dropped {}: {}",
        output::success("Database reset complete,"),
        result.tables_dropped.len(),
        output::list(&result.tables_dropped)
    ));
    Ok(())
}
