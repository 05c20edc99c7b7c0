//! db CLI - Main entry point

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use db_ops::toolkit::KitCommand;
use tracing_subscriber::EnvFilter;

use db_ops_cli::commands::{self, Context};
use db_ops_cli::error::CliError;
use db_ops_cli::prompt::{self, TypedConfirm};
use db_ops_cli::{env, output};

/// Database operations for drizzle-kit projects
#[derive(Parser, Debug)]
#[command(name = "db")]
#[command(author, version, about = "Health, reset, truncate, seed and refresh for drizzle-kit projects", long_about = None)]
struct Cli {
    /// Path to db.config.toml or a drizzle-kit config
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Target environment (dev, test, staging, prod); loads .env.<env>
    #[arg(short, long, global = true, value_name = "ENV", env = "DB_ENV")]
    env: Option<String>,

    /// Print the operation result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check database connection and health
    #[command(alias = "check")]
    Health,

    /// List database tables and schemas
    #[command(alias = "ls")]
    List {
        /// Also count the rows of every table
        #[arg(long)]
        count: bool,
    },

    /// Drop every table (keeps migration bookkeeping)
    Reset,

    /// Delete all data but keep table structure
    Truncate,

    /// Seed database from a SQL or script file
    Seed {
        /// Seed file (default: `seed` from db.config.toml)
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Refresh database (drop + generate + reset + migrate)
    Refresh,

    /// Generate new migrations (drizzle-kit)
    Generate,

    /// Apply migrations (drizzle-kit)
    Migrate,

    /// Push schema changes (drizzle-kit)
    Push,

    /// Pull the schema from the database (drizzle-kit)
    Pull,

    /// Open Drizzle Studio (drizzle-kit)
    Studio,

    /// Drop a migration from the migrations folder (drizzle-kit)
    Drop,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", output::err_line(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let cwd = std::env::current_dir().map_err(|e| CliError::IoError(e.to_string()))?;

    let environment = env::resolve(cli.env.as_deref(), prompt::is_interactive())?;
    env::load(environment, &cwd)?;

    let ctx = Context::new(environment, cli.config.as_deref(), &cwd, cli.json)?;
    let mut confirm = TypedConfirm;

    match cli.command {
        Command::Health => commands::health::run(&ctx),
        Command::List { count } => commands::list::run(&ctx, count),
        Command::Reset => commands::reset::run(&ctx, &mut confirm),
        Command::Truncate => commands::truncate::run(&ctx, &mut confirm),
        Command::Seed { file } => commands::seed::run(&ctx, file),
        Command::Refresh => commands::refresh::run(&ctx, &mut confirm),
        Command::Generate => commands::kit::run(&ctx, KitCommand::Generate),
        Command::Migrate => commands::kit::run(&ctx, KitCommand::Migrate),
        Command::Push => commands::kit::run(&ctx, KitCommand::Push),
        Command::Pull => commands::kit::run(&ctx, KitCommand::Pull),
        Command::Studio => commands::kit::run(&ctx, KitCommand::Studio),
        Command::Drop => commands::kit::run(&ctx, KitCommand::Drop),
    }
}
