use cov_core::changelog::ChangeLog;
use cov_core::entities::{Approval, AuditLogEntry, Contract, ContractVersion, NewContract};
use cov_core::orchestrator::ApprovalPolicy;
use schemars::{Schema, schema_for};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

const TYPE_NAMES: &[&str] = &[
    "contract",
    "new-contract",
    "approval",
    "version",
    "change-log",
    "audit-entry",
    "policy",
];

fn schema_for_name(name: &str) -> Option<Schema> {
    let schema = match name.trim().replace('_', "-").as_str() {
        "contract" => schema_for!(Contract),
        "new-contract" => schema_for!(NewContract),
        "approval" => schema_for!(Approval),
        "version" => schema_for!(ContractVersion),
        "change-log" => schema_for!(ChangeLog),
        "audit-entry" => schema_for!(AuditLogEntry),
        "policy" => schema_for!(ApprovalPolicy),
        _ => return None,
    };
    Some(schema)
}

/// Handle `cov schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let Some(schema) = schema_for_name(&args.type_name) else {
        anyhow::bail!(
            "unknown schema type '{}'; expected one of: {}",
            args.type_name,
            TYPE_NAMES.join(", ")
        );
    };
    output(&schema, flags.format)
}
