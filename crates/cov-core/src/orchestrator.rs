//! Approval orchestration: which tracks are required, and what status the
//! current round's approvals add up to.
//!
//! The status decision is a pure fold over the round's approvals, never an
//! incremental patch, so the order in which tracks resolve does not change the
//! result.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Approval, Contract};
use crate::enums::{ApprovalState, ContractStatus, LifecycleEvent, ReviewLevel, Track};

/// Default minimum length for a cancellation reason.
pub const DEFAULT_MIN_CANCEL_REASON_LEN: usize = 10;

/// Default amount (minor units) at which finance review becomes mandatory.
pub const DEFAULT_FINANCE_THRESHOLD_MINOR: i64 = 5_000_000;

/// Routing thresholds for approval tracks.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ApprovalPolicy {
    /// Amount (minor units) at or above which the finance track is required.
    pub finance_threshold_minor: i64,
    /// Amount (minor units) at or above which head-level legal sign-off is
    /// mandatory. `None` leaves it to the contract's explicit flag.
    pub head_signoff_threshold_minor: Option<i64>,
    pub min_cancel_reason_len: usize,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            finance_threshold_minor: DEFAULT_FINANCE_THRESHOLD_MINOR,
            head_signoff_threshold_minor: None,
            min_cancel_reason_len: DEFAULT_MIN_CANCEL_REASON_LEN,
        }
    }
}

impl ApprovalPolicy {
    /// Tracks that must approve `contract`. Legal is always first.
    #[must_use]
    pub fn required_tracks(&self, contract: &Contract) -> Vec<Track> {
        let over_threshold = contract
            .amount_minor
            .is_some_and(|amount| amount >= self.finance_threshold_minor);
        if contract.finance_review_requested || over_threshold {
            vec![Track::Legal, Track::Finance]
        } else {
            vec![Track::Legal]
        }
    }

    /// Whether the contract needs head-level legal sign-off before approval.
    #[must_use]
    pub fn head_signoff_mandatory(&self, contract: &Contract) -> bool {
        contract.head_signoff_required
            || self
                .head_signoff_threshold_minor
                .zip(contract.amount_minor)
                .is_some_and(|(threshold, amount)| amount >= threshold)
    }

    /// The event a submit of `contract` feeds the state machine.
    #[must_use]
    pub fn submit_event(&self, contract: &Contract) -> LifecycleEvent {
        if self.required_tracks(contract).len() > 1 {
            LifecycleEvent::Submit
        } else {
            LifecycleEvent::SubmitSingleTrack
        }
    }
}

/// Folded state of one track within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Pending(ReviewLevel),
    Approved,
    Rejected,
    RevisionRequested,
}

/// What the current round's approvals add up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// At least one required track is still open; the contract sits in this status.
    InProgress(ContractStatus),
    /// Every required track approved, but head-level sign-off is still owed.
    NeedsHeadSignoff,
    Approved,
    Rejected,
    RevisionRequested,
}

impl ReviewOutcome {
    /// Status the contract should hold for this outcome.
    #[must_use]
    pub const fn status(self) -> ContractStatus {
        match self {
            Self::InProgress(status) => status,
            Self::NeedsHeadSignoff => ContractStatus::PendingLegalHead,
            Self::Approved => ContractStatus::Approved,
            Self::Rejected => ContractStatus::Rejected,
            Self::RevisionRequested => ContractStatus::RevisionRequested,
        }
    }

    /// State-machine event that moves a contract in `current` to this outcome.
    ///
    /// Returns `None` when the contract already holds the outcome's status.
    #[must_use]
    pub fn event_from(self, current: ContractStatus) -> Option<LifecycleEvent> {
        if self.status() == current {
            return None;
        }
        let event = match self {
            Self::Approved => LifecycleEvent::AllTracksCleared,
            Self::NeedsHeadSignoff | Self::InProgress(ContractStatus::PendingLegalHead) => {
                LifecycleEvent::RequireHeadSignoff
            }
            Self::InProgress(ContractStatus::LegalReviewInProgress) => {
                LifecycleEvent::FinanceCleared
            }
            Self::InProgress(_) => LifecycleEvent::LegalCleared,
            Self::Rejected => LifecycleEvent::Reject,
            Self::RevisionRequested => LifecycleEvent::RequestRevision,
        };
        Some(event)
    }
}

/// Fold one track's approvals in a round into a single state.
///
/// A missing approval counts as pending at manager level.
#[must_use]
pub fn fold_track(round: &[Approval], track: Track) -> TrackState {
    let mut approved = false;
    let mut revision = false;
    for approval in round.iter().filter(|a| a.track == track) {
        match approval.state {
            ApprovalState::Pending => return TrackState::Pending(approval.level),
            ApprovalState::Rejected => return TrackState::Rejected,
            ApprovalState::RevisionRequested => revision = true,
            ApprovalState::Approved => approved = true,
        }
    }
    if revision {
        TrackState::RevisionRequested
    } else if approved {
        TrackState::Approved
    } else {
        TrackState::Pending(ReviewLevel::Manager)
    }
}

/// Fold the round's approvals for `required` tracks into one outcome.
///
/// `round` must contain only approvals of the contract's current review
/// round. The result does not depend on the order of `round`.
#[must_use]
pub fn fold_round(required: &[Track], round: &[Approval], head_signoff_mandatory: bool) -> ReviewOutcome {
    let states: Vec<(Track, TrackState)> =
        required.iter().map(|&t| (t, fold_track(round, t))).collect();

    if states.iter().any(|(_, s)| *s == TrackState::Rejected) {
        return ReviewOutcome::Rejected;
    }
    if states.iter().any(|(_, s)| *s == TrackState::RevisionRequested) {
        return ReviewOutcome::RevisionRequested;
    }

    let pending: Vec<(Track, ReviewLevel)> = states
        .iter()
        .filter_map(|(t, s)| match s {
            TrackState::Pending(level) => Some((*t, *level)),
            _ => None,
        })
        .collect();

    if !pending.is_empty() {
        let status = if pending.contains(&(Track::Legal, ReviewLevel::Head)) {
            ContractStatus::PendingLegalHead
        } else if pending.len() > 1 {
            ContractStatus::InReview
        } else if pending[0].0 == Track::Legal {
            ContractStatus::LegalReviewInProgress
        } else {
            ContractStatus::FinanceReviewInProgress
        };
        return ReviewOutcome::InProgress(status);
    }

    let head_signed = round.iter().any(|a| {
        a.track == Track::Legal && a.level == ReviewLevel::Head && a.state == ApprovalState::Approved
    });
    if head_signoff_mandatory && !head_signed {
        ReviewOutcome::NeedsHeadSignoff
    } else {
        ReviewOutcome::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Counterparty;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn contract() -> Contract {
        let now = Utc::now();
        Contract {
            id: "ctr-00000001".into(),
            title: "Supply agreement".into(),
            status: ContractStatus::InReview,
            counterparty: Counterparty {
                name: "Globex".into(),
                email: None,
                organization: None,
            },
            amount_minor: None,
            currency: None,
            finance_review_requested: false,
            head_signoff_required: false,
            review_round: 1,
            latest_version: 1,
            row_version: 0,
            created_by: "usr-1".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn approval(id: &str, track: Track, state: ApprovalState, level: ReviewLevel) -> Approval {
        Approval {
            id: id.into(),
            contract_id: "ctr-00000001".into(),
            track,
            state,
            level,
            round: 1,
            actor_id: None,
            comment: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn legal_is_always_required() {
        let policy = ApprovalPolicy::default();
        assert_eq!(policy.required_tracks(&contract()), vec![Track::Legal]);
    }

    #[test]
    fn finance_required_by_amount_or_flag() {
        let policy = ApprovalPolicy {
            finance_threshold_minor: 1_000,
            ..ApprovalPolicy::default()
        };
        let mut c = contract();
        c.amount_minor = Some(999);
        assert_eq!(policy.required_tracks(&c), vec![Track::Legal]);
        c.amount_minor = Some(1_000);
        assert_eq!(policy.required_tracks(&c), vec![Track::Legal, Track::Finance]);
        c.amount_minor = None;
        c.finance_review_requested = true;
        assert_eq!(policy.required_tracks(&c), vec![Track::Legal, Track::Finance]);
    }

    #[test]
    fn head_signoff_by_flag_or_threshold() {
        let mut c = contract();
        let policy = ApprovalPolicy::default();
        assert!(!policy.head_signoff_mandatory(&c));
        c.head_signoff_required = true;
        assert!(policy.head_signoff_mandatory(&c));

        let policy = ApprovalPolicy {
            head_signoff_threshold_minor: Some(10_000),
            ..ApprovalPolicy::default()
        };
        let mut c = contract();
        c.amount_minor = Some(10_000);
        assert!(policy.head_signoff_mandatory(&c));
    }

    #[test]
    fn submit_event_follows_track_count() {
        let policy = ApprovalPolicy::default();
        let mut c = contract();
        c.status = ContractStatus::Draft;
        assert_eq!(policy.submit_event(&c), LifecycleEvent::SubmitSingleTrack);
        c.finance_review_requested = true;
        assert_eq!(policy.submit_event(&c), LifecycleEvent::Submit);
    }

    #[test]
    fn both_pending_is_in_review() {
        let round = vec![
            approval("a", Track::Legal, ApprovalState::Pending, ReviewLevel::Manager),
            approval("b", Track::Finance, ApprovalState::Pending, ReviewLevel::Manager),
        ];
        let outcome = fold_round(&[Track::Legal, Track::Finance], &round, false);
        assert_eq!(outcome, ReviewOutcome::InProgress(ContractStatus::InReview));
    }

    #[test]
    fn one_track_left_names_that_track() {
        let round = vec![
            approval("a", Track::Legal, ApprovalState::Approved, ReviewLevel::Manager),
            approval("b", Track::Finance, ApprovalState::Pending, ReviewLevel::Manager),
        ];
        let outcome = fold_round(&[Track::Legal, Track::Finance], &round, false);
        assert_eq!(
            outcome,
            ReviewOutcome::InProgress(ContractStatus::FinanceReviewInProgress)
        );
        assert_eq!(
            outcome.event_from(ContractStatus::InReview),
            Some(LifecycleEvent::LegalCleared)
        );
    }

    #[test]
    fn escalated_legal_holds_pending_legal_head() {
        let round = vec![
            approval("a", Track::Legal, ApprovalState::Pending, ReviewLevel::Head),
            approval("b", Track::Finance, ApprovalState::Approved, ReviewLevel::Manager),
        ];
        let outcome = fold_round(&[Track::Legal, Track::Finance], &round, false);
        assert_eq!(outcome, ReviewOutcome::InProgress(ContractStatus::PendingLegalHead));
        assert_eq!(outcome.event_from(ContractStatus::PendingLegalHead), None);
    }

    #[test]
    fn fold_is_order_independent() {
        let legal = approval("a", Track::Legal, ApprovalState::Approved, ReviewLevel::Manager);
        let finance = approval("b", Track::Finance, ApprovalState::Approved, ReviewLevel::Manager);
        let required = [Track::Legal, Track::Finance];
        let forward = fold_round(&required, &[legal.clone(), finance.clone()], false);
        let backward = fold_round(&required, &[finance, legal], false);
        assert_eq!(forward, ReviewOutcome::Approved);
        assert_eq!(forward, backward);
    }

    #[test]
    fn mandatory_head_signoff_after_all_approved() {
        let manager = approval("a", Track::Legal, ApprovalState::Approved, ReviewLevel::Manager);
        let outcome = fold_round(&[Track::Legal], std::slice::from_ref(&manager), true);
        assert_eq!(outcome, ReviewOutcome::NeedsHeadSignoff);
        assert_eq!(
            outcome.event_from(ContractStatus::LegalReviewInProgress),
            Some(LifecycleEvent::RequireHeadSignoff)
        );

        let head = approval("b", Track::Legal, ApprovalState::Approved, ReviewLevel::Head);
        let outcome = fold_round(&[Track::Legal], &[manager, head], true);
        assert_eq!(outcome, ReviewOutcome::Approved);
        assert_eq!(
            outcome.event_from(ContractStatus::PendingLegalHead),
            Some(LifecycleEvent::AllTracksCleared)
        );
    }

    #[test]
    fn rejection_dominates() {
        let round = vec![
            approval("a", Track::Legal, ApprovalState::Rejected, ReviewLevel::Manager),
            approval("b", Track::Finance, ApprovalState::Pending, ReviewLevel::Manager),
        ];
        let outcome = fold_round(&[Track::Legal, Track::Finance], &round, false);
        assert_eq!(outcome, ReviewOutcome::Rejected);
    }

    #[test]
    fn unrequired_tracks_are_ignored() {
        let round = vec![
            approval("a", Track::Legal, ApprovalState::Approved, ReviewLevel::Manager),
            approval("b", Track::Finance, ApprovalState::Pending, ReviewLevel::Manager),
        ];
        assert_eq!(fold_round(&[Track::Legal], &round, false), ReviewOutcome::Approved);
    }
}
