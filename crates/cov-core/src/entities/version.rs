use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::changelog::ChangeLog;

/// An immutable snapshot of contract content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ContractVersion {
    pub id: String,
    pub contract_id: String,
    pub version_number: u32,
    /// Opaque serialized document content.
    pub content_snapshot: Vec<u8>,
    /// Absent for version 1.
    pub change_log: Option<ChangeLog>,
    /// Version number whose snapshot this version restores, if any.
    pub restored_from: Option<u32>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
