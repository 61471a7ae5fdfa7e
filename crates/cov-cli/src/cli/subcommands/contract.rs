use clap::Subcommand;

use crate::cli::root_commands::ContentSource;

/// Contract commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ContractCommands {
    /// Create a draft contract with its first version.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        counterparty: String,
        #[arg(long)]
        counterparty_email: Option<String>,
        #[arg(long)]
        counterparty_org: Option<String>,
        /// Contract value in minor currency units
        #[arg(long, requires = "currency")]
        amount_minor: Option<i64>,
        #[arg(long)]
        currency: Option<String>,
        /// Request finance review regardless of amount
        #[arg(long)]
        finance_review: bool,
        /// Require legal head sign-off regardless of amount
        #[arg(long)]
        head_signoff: bool,
        #[command(flatten)]
        source: ContentSource,
    },
    /// Get a contract by ID.
    Get { id: String },
    /// List contracts, most recently updated first.
    List {
        #[arg(long)]
        status: Option<String>,
    },
    /// Submit a draft for review.
    Submit { id: String },
    /// Resubmit after revision or rejection.
    Resubmit { id: String },
    /// Reopen a revision-requested contract as a draft.
    Revise { id: String },
    /// Escalate the pending legal review to the legal head.
    Escalate {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Cancel a contract that is not yet terminal.
    Cancel {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Send an approved contract to the counterparty.
    Send {
        id: String,
        /// Recipient email address (repeatable)
        #[arg(long, required = true)]
        to: Vec<String>,
    },
    /// Record the counterparty's signature.
    Countersign {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Activate a countersigned contract.
    Activate {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Mark a contract as expired before activation.
    Expire {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Terminate execution after the contract went out.
    Terminate {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Actions the acting user may take next.
    Actions { id: String },
    /// Full audit history of one contract, oldest first.
    History { id: String },
}
