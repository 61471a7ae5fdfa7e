//! What an actor may attempt next on a contract.
//!
//! [`compute_available_actions`] combines the transition table, the pending
//! approvals, and the actor's resolved capabilities. Callers render this set
//! instead of re-deriving status checks of their own.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::approval_track::pending_for;
use crate::collaborators::PermissionChecker;
use crate::entities::{Approval, Contract};
use crate::enums::{Action, ContractStatus, LifecycleEvent, ReviewLevel, Track};
use crate::state_machine::accepts;

/// An operation currently open to an actor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AvailableAction {
    Submit,
    Resubmit,
    ReviseDraft,
    EditContent,
    ReviewLegal,
    ReviewFinance,
    ReviewAsLegalHead,
    Escalate,
    ReturnToManager,
    Cancel,
    SendToCounterparty,
    RecordCountersignature,
    Activate,
    Expire,
    Terminate,
}

impl AvailableAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Resubmit => "resubmit",
            Self::ReviseDraft => "revise_draft",
            Self::EditContent => "edit_content",
            Self::ReviewLegal => "review_legal",
            Self::ReviewFinance => "review_finance",
            Self::ReviewAsLegalHead => "review_as_legal_head",
            Self::Escalate => "escalate",
            Self::ReturnToManager => "return_to_manager",
            Self::Cancel => "cancel",
            Self::SendToCounterparty => "send_to_counterparty",
            Self::RecordCountersignature => "record_countersignature",
            Self::Activate => "activate",
            Self::Expire => "expire",
            Self::Terminate => "terminate",
        }
    }
}

impl std::fmt::Display for AvailableAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of [`Action`]s an actor holds on one contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorCapabilities {
    granted: BTreeSet<Action>,
}

impl ActorCapabilities {
    /// Ask `checker` about every action for `actor_id` on `contract`.
    #[must_use]
    pub fn resolve(checker: &dyn PermissionChecker, actor_id: &str, contract: &Contract) -> Self {
        let granted = Action::ALL
            .into_iter()
            .filter(|&action| checker.can(actor_id, action, contract))
            .collect();
        Self { granted }
    }

    #[must_use]
    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            granted: actions.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn has(&self, action: Action) -> bool {
        self.granted.contains(&action)
    }
}

/// Compute the actions `caps` allows on `contract` right now.
///
/// `approvals` are the contract's approvals; only pending ones from the
/// current review round matter.
#[must_use]
pub fn compute_available_actions(
    contract: &Contract,
    approvals: &[Approval],
    caps: &ActorCapabilities,
) -> BTreeSet<AvailableAction> {
    use AvailableAction as A;

    let status = contract.status;
    let mut out = BTreeSet::new();
    let mut offer = |available: AvailableAction, allowed: bool| {
        if allowed {
            out.insert(available);
        }
    };

    let submittable = matches!(status, ContractStatus::Draft | ContractStatus::RevisionRequested);
    offer(A::Submit, submittable && caps.has(Action::Submit));
    offer(
        A::Resubmit,
        accepts(status, LifecycleEvent::Resubmit) && caps.has(Action::Resubmit),
    );
    offer(
        A::ReviseDraft,
        accepts(status, LifecycleEvent::ReviseDraft) && caps.has(Action::EditContent),
    );
    offer(
        A::EditContent,
        !status.is_terminal() && caps.has(Action::EditContent),
    );

    if status.is_under_review() {
        // Approvals left pending from an earlier round cannot be resolved.
        let current: Vec<Approval> = approvals
            .iter()
            .filter(|a| a.round == contract.review_round)
            .cloned()
            .collect();
        let legal = pending_for(&current, Track::Legal);
        let legal_level = legal.map(|a| a.level);
        offer(
            A::ReviewLegal,
            legal_level == Some(ReviewLevel::Manager) && caps.has(Action::ReviewLegal),
        );
        offer(
            A::ReviewAsLegalHead,
            legal_level == Some(ReviewLevel::Head) && caps.has(Action::ReviewAsLegalHead),
        );
        offer(
            A::ReviewFinance,
            pending_for(&current, Track::Finance).is_some() && caps.has(Action::ReviewFinance),
        );
        offer(
            A::Escalate,
            legal_level == Some(ReviewLevel::Manager)
                && accepts(status, LifecycleEvent::Escalate)
                && caps.has(Action::Escalate),
        );
        offer(
            A::ReturnToManager,
            legal_level == Some(ReviewLevel::Head)
                && accepts(status, LifecycleEvent::ReturnToManager)
                && caps.has(Action::ReviewAsLegalHead),
        );
    }

    let by_event = [
        (A::Cancel, LifecycleEvent::Cancel, Action::Cancel),
        (
            A::SendToCounterparty,
            LifecycleEvent::SendToCounterparty,
            Action::SendToCounterparty,
        ),
        (
            A::RecordCountersignature,
            LifecycleEvent::Countersign,
            Action::RecordCountersignature,
        ),
        (A::Activate, LifecycleEvent::Activate, Action::Activate),
        (A::Expire, LifecycleEvent::Expire, Action::Expire),
        (A::Terminate, LifecycleEvent::Terminate, Action::Terminate),
    ];
    for (available, event, action) in by_event {
        offer(available, accepts(status, event) && caps.has(action));
    }

    out
}
