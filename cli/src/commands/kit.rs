//! drizzle-kit passthrough commands

use db_ops::toolkit::{Kit, KitCommand};

use super::Context;
use crate::error::CliError;
use crate::output;

pub fn run(ctx: &Context, command: KitCommand) -> Result<(), CliError> {
    let kit = ctx.toolkit();
    kit.validate()?;
    ctx.say(format!("{} {}", output::label("Running"), kit.command_line(command)));
    kit.run(command)?;
    Ok(())
}
