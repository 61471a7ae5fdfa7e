use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{AuditAction, ContractStatus};

/// An append-only audit trail entry recording one lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuditLogEntry {
    pub id: String,
    pub contract_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    /// `None` only for the entry that creates the contract.
    pub from_status: Option<ContractStatus>,
    pub to_status: ContractStatus,
    pub comment: Option<String>,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
