use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ApprovalState, ReviewLevel, Track};

/// One reviewing function's decision record for a contract.
///
/// Resolved exactly once; never deleted. Superseded rounds stay for audit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Approval {
    pub id: String,
    pub contract_id: String,
    pub track: Track,
    pub state: ApprovalState,
    pub level: ReviewLevel,
    pub round: u32,
    pub actor_id: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Approval {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == ApprovalState::Pending
    }
}
