use clap::Subcommand;

/// Approval commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ApprovalCommands {
    /// List every approval of a contract, across rounds.
    List { contract_id: String },
    /// Get an approval by ID.
    Get { id: String },
    /// Approve a pending review.
    Approve {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Reject a pending review.
    Reject {
        id: String,
        #[arg(long)]
        comment: String,
    },
    /// Send the contract back to its author for changes.
    RequestRevision {
        id: String,
        #[arg(long)]
        comment: String,
    },
    /// Hand an escalated legal review back to manager level.
    ReturnToManager {
        id: String,
        #[arg(long)]
        comment: String,
    },
}
