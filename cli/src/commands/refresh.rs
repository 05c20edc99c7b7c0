//! Refresh command implementation
//!
//! drop -> generate -> reset -> migrate. Gated in production.

use db_ops::ops::reset_database;
use db_ops::safety::{Confirm, DestructiveAction, Gate};
use db_ops::toolkit::{self, REFRESH_STEPS};

use super::Context;
use crate::error::CliError;
use crate::output;

pub fn run(ctx: &Context, confirm: &mut dyn Confirm) -> Result<(), CliError> {
    let resolved = ctx.load()?;
    let kit = ctx.toolkit();
    kit.validate()?;

    if ctx.confirm(DestructiveAction::Refresh, &resolved, confirm)? == Gate::Declined {
        return Ok(());
    }

    let names: Vec<_> = REFRESH_STEPS.iter().map(|s| s.as_str()).collect();
    ctx.say(format!("{} {}", output::heading("Executing workflow:"), names.join(" -> ")));

    let mut index = 0;
    let outcome = toolkit::refresh(
        &kit,
        || reset_database(&resolved.database),
        |step| {
            index += 1;
            ctx.say(output::step(index, REFRESH_STEPS.len(), step.as_str()));
        },
    );
    let result = match outcome {
        Ok(result) => result,
        Err(failure) => {
            if let Some(reset) = &failure.reset {
                ctx.emit(reset)?;
                if !reset.tables_dropped.is_empty() {
                    ctx.say(format!(
                        "  {} {}",
                        output::warning("Dropped before failure:"),
                        output::list(&reset.tables_dropped)
                    ));
                }
            }
            return Err(CliError::Failed(failure.to_string()));
        }
    };
    ctx.emit(&result)?;

    ctx.say(format!(
        "{} dropped {}",
        output::success("Workflow completed successfully,"),
        output::list(&result.tables_dropped)
    ));
    Ok(())
}
