//! Domain error taxonomy for the contract lifecycle.
//!
//! These errors are returned (never panicked) by every lifecycle operation so
//! callers can render precise messages. Storage failures are defined in
//! `cov-db`, which wraps this type.

use thiserror::Error;

use crate::enums::{Action, ApprovalState, ContractStatus, LifecycleEvent};

/// Errors raised by the lifecycle core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The event is not defined for the contract's current status.
    #[error("Invalid transition: contract {contract_id} in status {from} does not accept {event}")]
    InvalidTransition {
        contract_id: String,
        from: ContractStatus,
        event: LifecycleEvent,
    },

    /// A version mutation on a contract that is already terminal.
    #[error("Contract {contract_id} is {status} and accepts no further changes")]
    ContractTerminal {
        contract_id: String,
        status: ContractStatus,
    },

    /// Attempt to resolve an approval that is already resolved, or to open a
    /// second pending approval on the same track.
    #[error("Invalid approval state: approval {approval_id} is {state}")]
    InvalidApprovalState {
        approval_id: String,
        state: ApprovalState,
    },

    /// A required comment or reason is missing or too short, or input is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The permission checker denied the action.
    #[error("Unauthorized: actor {actor_id} may not {action}")]
    Unauthorized { actor_id: String, action: Action },

    /// Lost the per-contract serialization race. Safe for the caller to retry once.
    #[error("Concurrent modification of contract {contract_id}")]
    ConcurrentModification { contract_id: String },

    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },
}

impl CoreError {
    /// Whether the caller may retry the operation once.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Shorthand for [`CoreError::NotFound`].
    #[must_use]
    pub fn not_found(entity_type: &str, id: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}
