use clap::Subcommand;

use crate::cli::root_commands::ContentSource;

/// Version commands.
#[derive(Clone, Debug, Subcommand)]
pub enum VersionCommands {
    /// Record new content for a contract.
    Create {
        contract_id: String,
        #[command(flatten)]
        source: ContentSource,
    },
    /// Record a new version carrying an earlier version's content.
    Restore {
        contract_id: String,
        version_id: String,
    },
    /// Get a version by ID.
    Get {
        id: String,
        /// Print the stored content instead of version metadata
        #[arg(long)]
        content: bool,
    },
    /// The newest version of a contract.
    Latest { contract_id: String },
    /// All versions of a contract, oldest first.
    List { contract_id: String },
}
