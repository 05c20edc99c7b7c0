//! db CLI - operational database commands for drizzle-kit projects
//!
//! # Configuration
//!
//! `db.config.toml` in the project root points at the drizzle-kit config and
//! an optional seed file:
//!
//! ```toml
//! drizzleConfig = "./drizzle.config.ts"
//! seed = "./seeds/dev.sql"
//! ```
//!
//! Without it, `drizzle.config.toml`, `drizzle.config.json` and
//! `drizzle.config.ts` (and friends) are tried in that order.
//!
//! # Commands
//!
//! - `db health` - Check the connection and report the server version
//! - `db list [--count]` - List tables and schemas
//! - `db reset` - Drop every table that is not allowlisted
//! - `db truncate` - Delete every row, keep the tables
//! - `db seed [--file PATH]` - Run a seed file
//! - `db refresh` - drop -> generate -> reset -> migrate
//! - `db generate|migrate|push|pull|studio|drop` - forwarded to drizzle-kit
//!
//! Every command loads `.env.<env>` first; `--env` picks the environment.

pub mod commands;
pub mod env;
pub mod error;
pub mod output;
pub mod prompt;

pub use error::CliError;
