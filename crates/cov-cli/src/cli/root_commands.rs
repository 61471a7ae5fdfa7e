use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::subcommands::{ApprovalCommands, ContractCommands, VersionCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Contracts and their lifecycle.
    Contract {
        #[command(subcommand)]
        action: ContractCommands,
    },
    /// Review decisions.
    Approval {
        #[command(subcommand)]
        action: ApprovalCommands,
    },
    /// Content versions.
    Version {
        #[command(subcommand)]
        action: VersionCommands,
    },
    /// Query the audit trail.
    Audit(AuditArgs),
    /// Dump JSON schema for a registered type.
    Schema(SchemaArgs),
}

/// Where new content comes from: inline text or a file read as raw bytes.
#[derive(Clone, Debug, Default, Args)]
#[group(multiple = false)]
pub struct ContentSource {
    /// Inline content
    #[arg(long)]
    pub content: Option<String>,
    /// Read content bytes from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub contract: Option<String>,
    #[arg(long)]
    pub actor_id: Option<String>,
    /// Audit action, e.g. `legal_approved`
    #[arg(long)]
    pub action: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// One of: contract, new-contract, approval, version, change-log, audit-entry, policy
    pub type_name: String,
}
