use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{ACTOR_ENV, GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `cov` binary.
#[derive(Debug, Parser)]
#[command(name = "cov", version, about = "Covenant - contract review and execution")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Acting user id (defaults to COVENANT_ACTOR)
    #[arg(short, long, global = true)]
    pub actor: Option<String>,

    /// Database path, overriding `database.path` from configuration
    #[arg(long, global = true)]
    pub database: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
            actor: self
                .actor
                .clone()
                .or_else(|| std::env::var(ACTOR_ENV).ok()),
            database: self.database.clone(),
        }
    }
}
