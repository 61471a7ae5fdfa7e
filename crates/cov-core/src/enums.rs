//! Status enums, approval tracks, actions, and audit tags for Covenant.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`,
//! and `as_str()` returns the same string used in SQL storage. The transition
//! table itself lives in [`crate::state_machine`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ContractStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a contract.
///
/// ```text
/// draft → in_review → legal_review_in_progress ─┐
///                   → finance_review_in_progress ┼→ pending_legal_head → approved
///                                                └────────────────────→ approved
/// approved → sent_to_counterparty → countersigned → active
///
/// side exits: revision_requested (→ draft), rejected (→ in_review on resubmit),
///             cancelled, expired, terminated
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    InReview,
    LegalReviewInProgress,
    FinanceReviewInProgress,
    PendingLegalHead,
    Approved,
    SentToCounterparty,
    Countersigned,
    Active,
    RevisionRequested,
    Rejected,
    Cancelled,
    Expired,
    Terminated,
}

impl ContractStatus {
    pub const ALL: [Self; 14] = [
        Self::Draft,
        Self::InReview,
        Self::LegalReviewInProgress,
        Self::FinanceReviewInProgress,
        Self::PendingLegalHead,
        Self::Approved,
        Self::SentToCounterparty,
        Self::Countersigned,
        Self::Active,
        Self::RevisionRequested,
        Self::Rejected,
        Self::Cancelled,
        Self::Expired,
        Self::Terminated,
    ];

    /// Terminal statuses accept no approval or version mutation.
    ///
    /// `Rejected` is terminal but still accepts a single `Resubmit` event.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Active | Self::Cancelled | Self::Rejected | Self::Terminated | Self::Expired
        )
    }

    /// Whether approval tracks are open and actionable in this status.
    #[must_use]
    pub const fn is_under_review(self) -> bool {
        matches!(
            self,
            Self::InReview
                | Self::LegalReviewInProgress
                | Self::FinanceReviewInProgress
                | Self::PendingLegalHead
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InReview => "in_review",
            Self::LegalReviewInProgress => "legal_review_in_progress",
            Self::FinanceReviewInProgress => "finance_review_in_progress",
            Self::PendingLegalHead => "pending_legal_head",
            Self::Approved => "approved",
            Self::SentToCounterparty => "sent_to_counterparty",
            Self::Countersigned => "countersigned",
            Self::Active => "active",
            Self::RevisionRequested => "revision_requested",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// An input to the status state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Submit with both tracks required.
    Submit,
    /// Submit with only the legal track required.
    SubmitSingleTrack,
    Resubmit,
    ReviseDraft,
    /// Legal resolved, finance still pending.
    LegalCleared,
    /// Finance resolved, legal still pending.
    FinanceCleared,
    AllTracksCleared,
    RequireHeadSignoff,
    Escalate,
    ReturnToManager,
    Reject,
    RequestRevision,
    SendToCounterparty,
    Countersign,
    Activate,
    Cancel,
    Expire,
    Terminate,
}

impl LifecycleEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::SubmitSingleTrack => "submit_single_track",
            Self::Resubmit => "resubmit",
            Self::ReviseDraft => "revise_draft",
            Self::LegalCleared => "legal_cleared",
            Self::FinanceCleared => "finance_cleared",
            Self::AllTracksCleared => "all_tracks_cleared",
            Self::RequireHeadSignoff => "require_head_signoff",
            Self::Escalate => "escalate",
            Self::ReturnToManager => "return_to_manager",
            Self::Reject => "reject",
            Self::RequestRevision => "request_revision",
            Self::SendToCounterparty => "send_to_counterparty",
            Self::Countersign => "countersign",
            Self::Activate => "activate",
            Self::Cancel => "cancel",
            Self::Expire => "expire",
            Self::Terminate => "terminate",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// An independent reviewing function.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Legal,
    Finance,
}

impl Track {
    pub const ALL: [Self; 2] = [Self::Legal, Self::Finance];

    /// Permission needed to resolve a manager-level approval on this track.
    #[must_use]
    pub const fn review_action(self) -> Action {
        match self {
            Self::Legal => Action::ReviewLegal,
            Self::Finance => Action::ReviewFinance,
        }
    }

    /// Event emitted when this track clears while the other is still open.
    #[must_use]
    pub const fn cleared_event(self) -> LifecycleEvent {
        match self {
            Self::Legal => LifecycleEvent::LegalCleared,
            Self::Finance => LifecycleEvent::FinanceCleared,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Finance => "finance",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ApprovalState
// ---------------------------------------------------------------------------

/// State of a single approval record.
///
/// ```text
/// pending → approved
///         → rejected
///         → revision_requested
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
    RevisionRequested,
}

impl ApprovalState {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected, Self::RevisionRequested],
            Self::Approved | Self::Rejected | Self::RevisionRequested => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RevisionRequested => "revision_requested",
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewLevel
// ---------------------------------------------------------------------------

/// Authority level currently holding an approval.
///
/// Escalation moves a pending legal approval to `Head` without resolving it;
/// return-to-manager moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewLevel {
    Manager,
    Head,
}

impl ReviewLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for ReviewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A capability queried through the permission checker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Submit,
    Resubmit,
    ReviewLegal,
    ReviewFinance,
    ReviewAsLegalHead,
    Escalate,
    Cancel,
    SendToCounterparty,
    RecordCountersignature,
    Activate,
    Expire,
    Terminate,
    EditContent,
}

impl Action {
    pub const ALL: [Self; 13] = [
        Self::Submit,
        Self::Resubmit,
        Self::ReviewLegal,
        Self::ReviewFinance,
        Self::ReviewAsLegalHead,
        Self::Escalate,
        Self::Cancel,
        Self::SendToCounterparty,
        Self::RecordCountersignature,
        Self::Activate,
        Self::Expire,
        Self::Terminate,
        Self::EditContent,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Resubmit => "resubmit",
            Self::ReviewLegal => "review_legal",
            Self::ReviewFinance => "review_finance",
            Self::ReviewAsLegalHead => "review_as_legal_head",
            Self::Escalate => "escalate",
            Self::Cancel => "cancel",
            Self::SendToCounterparty => "send_to_counterparty",
            Self::RecordCountersignature => "record_countersignature",
            Self::Activate => "activate",
            Self::Expire => "expire",
            Self::Terminate => "terminate",
            Self::EditContent => "edit_content",
        }
    }

    /// Look up an action by its storage name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Tag recorded on every audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Submitted,
    Resubmitted,
    DraftReopened,
    LegalApproved,
    FinanceApproved,
    LegalHeadApproved,
    LegalRejected,
    FinanceRejected,
    RevisionRequested,
    Escalated,
    ReturnedToManager,
    Cancelled,
    SentToCounterparty,
    Countersigned,
    Activated,
    Expired,
    Terminated,
    VersionCreated,
    VersionRestored,
}

impl AuditAction {
    /// Tag for an approval granted on `track` at `level`.
    #[must_use]
    pub const fn approved(track: Track, level: ReviewLevel) -> Self {
        match (track, level) {
            (Track::Legal, ReviewLevel::Head) => Self::LegalHeadApproved,
            (Track::Legal, ReviewLevel::Manager) => Self::LegalApproved,
            (Track::Finance, _) => Self::FinanceApproved,
        }
    }

    /// Tag for a rejection on `track`.
    #[must_use]
    pub const fn rejected(track: Track) -> Self {
        match track {
            Track::Legal => Self::LegalRejected,
            Track::Finance => Self::FinanceRejected,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::Resubmitted => "resubmitted",
            Self::DraftReopened => "draft_reopened",
            Self::LegalApproved => "legal_approved",
            Self::FinanceApproved => "finance_approved",
            Self::LegalHeadApproved => "legal_head_approved",
            Self::LegalRejected => "legal_rejected",
            Self::FinanceRejected => "finance_rejected",
            Self::RevisionRequested => "revision_requested",
            Self::Escalated => "escalated",
            Self::ReturnedToManager => "returned_to_manager",
            Self::Cancelled => "cancelled",
            Self::SentToCounterparty => "sent_to_counterparty",
            Self::Countersigned => "countersigned",
            Self::Activated => "activated",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
            Self::VersionCreated => "version_created",
            Self::VersionRestored => "version_restored",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: verify serde roundtrip produces the expected JSON string.
    macro_rules! test_serde_roundtrip {
        ($name:ident, $ty:ty, $variant:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let val: $ty = $variant;
                let json = serde_json::to_string(&val).unwrap();
                assert_eq!(json, format!("\"{}\"", $expected));
                let back: $ty = serde_json::from_str(&json).unwrap();
                assert_eq!(back, val);
                assert_eq!(val.as_str(), $expected);
            }
        };
    }

    test_serde_roundtrip!(
        status_pending_legal_head,
        ContractStatus,
        ContractStatus::PendingLegalHead,
        "pending_legal_head"
    );
    test_serde_roundtrip!(
        status_sent_to_counterparty,
        ContractStatus,
        ContractStatus::SentToCounterparty,
        "sent_to_counterparty"
    );
    test_serde_roundtrip!(
        event_require_head_signoff,
        LifecycleEvent,
        LifecycleEvent::RequireHeadSignoff,
        "require_head_signoff"
    );
    test_serde_roundtrip!(track_finance, Track, Track::Finance, "finance");
    test_serde_roundtrip!(
        approval_revision_requested,
        ApprovalState,
        ApprovalState::RevisionRequested,
        "revision_requested"
    );
    test_serde_roundtrip!(level_head, ReviewLevel, ReviewLevel::Head, "head");
    test_serde_roundtrip!(
        action_review_as_legal_head,
        Action,
        Action::ReviewAsLegalHead,
        "review_as_legal_head"
    );
    test_serde_roundtrip!(
        audit_returned_to_manager,
        AuditAction,
        AuditAction::ReturnedToManager,
        "returned_to_manager"
    );

    #[test]
    fn every_status_roundtrips_through_as_str() {
        for status in ContractStatus::ALL {
            let parsed: ContractStatus =
                serde_json::from_value(serde_json::Value::String(status.as_str().into())).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = ContractStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                ContractStatus::Active,
                ContractStatus::Rejected,
                ContractStatus::Cancelled,
                ContractStatus::Expired,
                ContractStatus::Terminated,
            ]
        );
    }

    #[test]
    fn approval_state_transitions() {
        assert!(ApprovalState::Pending.can_transition_to(ApprovalState::Approved));
        assert!(ApprovalState::Pending.can_transition_to(ApprovalState::RevisionRequested));
        assert!(!ApprovalState::Approved.can_transition_to(ApprovalState::Rejected));
        assert!(ApprovalState::Rejected.allowed_next_states().is_empty());
    }

    #[test]
    fn audit_tags_per_track() {
        assert_eq!(
            AuditAction::approved(Track::Legal, ReviewLevel::Head),
            AuditAction::LegalHeadApproved
        );
        assert_eq!(
            AuditAction::approved(Track::Finance, ReviewLevel::Head),
            AuditAction::FinanceApproved
        );
        assert_eq!(AuditAction::rejected(Track::Legal), AuditAction::LegalRejected);
    }

    #[test]
    fn action_lookup_by_name() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.as_str()), Some(action));
        }
        assert_eq!(Action::from_name("approve_everything"), None);
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", ContractStatus::InReview), "in_review");
        assert_eq!(format!("{}", LifecycleEvent::SubmitSingleTrack), "submit_single_track");
        assert_eq!(format!("{}", Track::Legal), "legal");
        assert_eq!(format!("{}", ApprovalState::Pending), "pending");
        assert_eq!(format!("{}", ReviewLevel::Manager), "manager");
        assert_eq!(format!("{}", Action::EditContent), "edit_content");
        assert_eq!(format!("{}", AuditAction::VersionRestored), "version_restored");
    }
}
