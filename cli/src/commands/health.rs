//! Health command implementation

use db_ops::ops::check_health;

use super::Context;
use crate::error::CliError;
use crate::output;

pub fn run(ctx: &Context) -> Result<(), CliError> {
    let resolved = ctx.load()?;
    ctx.say(output::heading("Checking database connection..."));

    let result = check_health(&resolved.database);
    ctx.emit(&result)?;

    if result.is_ok() {
        ctx.say(format!(
            "  {} {}",
            output::success("Connected:"),
            result.version.as_deref().unwrap_or("unknown version")
        ));
        Ok(())
    } else {
        Err(CliError::Failed(
            result.message.unwrap_or_else(|| "health check failed".into()),
        ))
    }
}
