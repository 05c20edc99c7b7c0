//! Seed command implementation

use std::path::PathBuf;

use db_ops::driver::DriverRegistry;
use db_ops::ops::seed_database_with;

use super::Context;
use crate::error::CliError;
use crate::output;

pub fn run(ctx: &Context, file: Option<PathBuf>) -> Result<(), CliError> {
    let path = file.or_else(|| ctx.seed_file().cloned()).ok_or_else(|| {
        CliError::Failed("no seed file: pass --file or set `seed` in db.config.toml".into())
    })?;
    let resolved = ctx.load()?;

    ctx.say(format!("{} {}", output::heading("Seeding from"), path.display()));
    let registry = DriverRegistry::default();
    let result = seed_database_with(&registry, &ctx.runner, &resolved.database, &path);
    ctx.emit(&result)?;

    if !result.success {
        return Err(CliError::Failed(
            result.error.unwrap_or_else(|| "database seeding failed".into()),
        ));
    }
    if let Some(message) = &result.message {
        ctx.say(output::success(message));
    }
    Ok(())
}
