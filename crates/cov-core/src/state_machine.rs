//! The authoritative contract status transition table.
//!
//! Every status change in Covenant goes through [`transition`]. A
//! `(status, event)` pair missing from [`next_status`] is an
//! `InvalidTransition`; there is no silent no-op path.

use chrono::{DateTime, Utc};

use crate::entities::Contract;
use crate::enums::{ContractStatus, LifecycleEvent};
use crate::errors::CoreError;

/// Look up the status that `event` leads to from `status`.
#[must_use]
#[allow(clippy::match_same_arms)]
pub const fn next_status(status: ContractStatus, event: LifecycleEvent) -> Option<ContractStatus> {
    use crate::enums::ContractStatus as S;
    use crate::enums::LifecycleEvent as E;

    let next = match (status, event) {
        (S::Draft | S::RevisionRequested, E::Submit) => S::InReview,
        (S::Draft | S::RevisionRequested, E::SubmitSingleTrack) => S::LegalReviewInProgress,
        (S::RevisionRequested, E::ReviseDraft) => S::Draft,
        (S::Rejected, E::Resubmit) => S::InReview,

        (S::InReview, E::LegalCleared) => S::FinanceReviewInProgress,
        (S::InReview, E::FinanceCleared) => S::LegalReviewInProgress,
        (S::LegalReviewInProgress | S::PendingLegalHead, E::LegalCleared) => {
            S::FinanceReviewInProgress
        }
        (
            S::InReview | S::LegalReviewInProgress | S::FinanceReviewInProgress | S::PendingLegalHead,
            E::AllTracksCleared,
        ) => S::Approved,
        (
            S::InReview | S::LegalReviewInProgress | S::FinanceReviewInProgress,
            E::RequireHeadSignoff,
        ) => S::PendingLegalHead,
        (S::InReview | S::LegalReviewInProgress, E::Escalate) => S::PendingLegalHead,
        (S::PendingLegalHead, E::ReturnToManager) => S::LegalReviewInProgress,
        (
            S::InReview | S::LegalReviewInProgress | S::FinanceReviewInProgress | S::PendingLegalHead,
            E::Reject,
        ) => S::Rejected,
        (
            S::InReview | S::LegalReviewInProgress | S::FinanceReviewInProgress | S::PendingLegalHead,
            E::RequestRevision,
        ) => S::RevisionRequested,

        (S::Approved, E::SendToCounterparty) => S::SentToCounterparty,
        (S::SentToCounterparty, E::Countersign) => S::Countersigned,
        (S::Countersigned, E::Activate) => S::Active,
        (S::Approved | S::SentToCounterparty | S::Countersigned, E::Expire) => S::Expired,
        (S::SentToCounterparty | S::Countersigned, E::Terminate) => S::Terminated,

        (s, E::Cancel) if !s.is_terminal() => S::Cancelled,

        _ => return None,
    };
    Some(next)
}

/// Whether `event` is defined for `status`.
#[must_use]
pub const fn accepts(status: ContractStatus, event: LifecycleEvent) -> bool {
    next_status(status, event).is_some()
}

/// Apply `event` to `contract`, returning the contract in its new status.
///
/// # Errors
///
/// Returns `CoreError::InvalidTransition` if the table has no entry for the
/// contract's current status and `event`.
pub fn transition(
    contract: &Contract,
    event: LifecycleEvent,
    now: DateTime<Utc>,
) -> Result<Contract, CoreError> {
    let next = next_status(contract.status, event).ok_or_else(|| CoreError::InvalidTransition {
        contract_id: contract.id.clone(),
        from: contract.status,
        event,
    })?;
    Ok(Contract {
        status: next,
        updated_at: now,
        ..contract.clone()
    })
}

/// Reject any mutation of a terminal contract.
///
/// This is the first check of every mutating operation; `event` names what
/// was attempted so the error can be rendered verbatim.
///
/// # Errors
///
/// Returns `CoreError::InvalidTransition` if the contract is terminal.
pub fn ensure_not_terminal(contract: &Contract, event: LifecycleEvent) -> Result<(), CoreError> {
    if contract.status.is_terminal() && !accepts(contract.status, event) {
        return Err(CoreError::InvalidTransition {
            contract_id: contract.id.clone(),
            from: contract.status,
            event,
        });
    }
    Ok(())
}
