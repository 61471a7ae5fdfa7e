use clap::ValueEnum;

/// Environment variable consulted when `--actor` is not given.
pub const ACTOR_ENV: &str = "COVENANT_ACTOR";

/// Shared output mode across all commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Raw,
}

/// Global flags available before or after subcommands.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub limit: Option<u32>,
    pub quiet: bool,
    pub verbose: bool,
    pub actor: Option<String>,
    pub database: Option<String>,
}

impl GlobalFlags {
    /// The acting user for a mutating command.
    ///
    /// # Errors
    ///
    /// Fails when neither `--actor` nor `COVENANT_ACTOR` is set.
    pub fn actor(&self) -> anyhow::Result<&str> {
        match self.actor.as_deref().map(str::trim) {
            Some(actor) if !actor.is_empty() => Ok(actor),
            _ => anyhow::bail!("no acting user: pass --actor or set {ACTOR_ENV}"),
        }
    }
}
