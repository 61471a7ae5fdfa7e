//! Validation for a single approval track.
//!
//! Pure functions, no side effects: the single-pending-per-track invariant and
//! resolve-once semantics live here so the service and the database index
//! agree on them.

use chrono::{DateTime, Utc};

use crate::entities::Approval;
use crate::enums::{ApprovalState, ReviewLevel, Track};
use crate::errors::CoreError;

/// Find the pending approval for `track`, if any.
#[must_use]
pub fn pending_for(approvals: &[Approval], track: Track) -> Option<&Approval> {
    approvals.iter().find(|a| a.track == track && a.is_pending())
}

/// Check that a new pending approval may be opened on `track`.
///
/// # Errors
///
/// Returns `CoreError::InvalidApprovalState` naming the existing pending
/// approval when one is already open.
pub fn ensure_can_open(approvals: &[Approval], track: Track) -> Result<(), CoreError> {
    match pending_for(approvals, track) {
        Some(existing) => Err(CoreError::InvalidApprovalState {
            approval_id: existing.id.clone(),
            state: existing.state,
        }),
        None => Ok(()),
    }
}

/// Check that `approval` can still be resolved.
///
/// # Errors
///
/// Returns `CoreError::InvalidApprovalState` if the approval is not pending.
pub fn ensure_pending(approval: &Approval) -> Result<(), CoreError> {
    if approval.is_pending() {
        Ok(())
    } else {
        Err(CoreError::InvalidApprovalState {
            approval_id: approval.id.clone(),
            state: approval.state,
        })
    }
}

/// Resolve a pending approval exactly once.
///
/// # Errors
///
/// Returns `CoreError::InvalidApprovalState` if the approval is not pending or
/// `outcome` is not a resolution of a pending approval.
pub fn resolve(
    approval: &Approval,
    outcome: ApprovalState,
    actor_id: &str,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Approval, CoreError> {
    ensure_pending(approval)?;
    if !approval.state.can_transition_to(outcome) {
        return Err(CoreError::InvalidApprovalState {
            approval_id: approval.id.clone(),
            state: approval.state,
        });
    }
    Ok(Approval {
        state: outcome,
        actor_id: Some(actor_id.to_string()),
        comment: comment.map(String::from),
        resolved_at: Some(now),
        ..approval.clone()
    })
}

/// Move a pending approval to another authority level without resolving it.
///
/// # Errors
///
/// Returns `CoreError::InvalidApprovalState` if the approval is not pending.
pub fn relevel(approval: &Approval, level: ReviewLevel) -> Result<Approval, CoreError> {
    ensure_pending(approval)?;
    Ok(Approval {
        level,
        ..approval.clone()
    })
}

/// Require a non-blank comment or reason of at least `min_len` characters.
///
/// # Errors
///
/// Returns `CoreError::Validation` naming `field` when the text is missing or too short.
pub fn require_text<'a>(
    text: Option<&'a str>,
    field: &str,
    min_len: usize,
) -> Result<&'a str, CoreError> {
    let trimmed = text.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() < min_len {
        return Err(CoreError::Validation(format!(
            "{field} must be at least {min_len} characters"
        )));
    }
    Ok(trimmed)
}
