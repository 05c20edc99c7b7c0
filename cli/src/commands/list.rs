//! List command implementation

use db_ops::ops::list_database;

use super::Context;
use crate::error::CliError;
use crate::output;

pub fn run(ctx: &Context, count: bool) -> Result<(), CliError> {
    let resolved = ctx.load()?;
    let result = list_database(&resolved.database, count);
    ctx.emit(&result)?;

    if !result.success {
        return Err(CliError::Failed(
            result.error.unwrap_or_else(|| "listing tables failed".into()),
        ));
    }

    ctx.say(format!("{} {}", output::label("Tables:"), result.tables.len()));
    for table in &result.tables {
        match result.row_counts.as_ref().and_then(|c| c.get(table)) {
            Some(rows) => ctx.say(format!("  {table} {}", output::muted(&format!("({rows} rows)")))),
            None => ctx.say(format!("  {table}")),
        }
    }
    if !result.schemas.is_empty() {
        ctx.say(format!("{} {}", output::label("Schemas:"), output::list(&result.schemas)));
    }
    Ok(())
}
