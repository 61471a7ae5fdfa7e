//! Narrow interfaces to the collaborators Covenant does not own: permission
//! decisions and notification delivery.
//!
//! The lifecycle service only ever talks to these traits. Implementations
//! here cover configuration-driven deployments, local tooling, and tests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::entities::Contract;
use crate::enums::{Action, AuditAction, ContractStatus};
use crate::errors::CoreError;

/// Actor key in a [`GrantTable`] whose grants apply to every actor.
pub const WILDCARD_ACTOR: &str = "*";

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// Answers whether an actor may perform an action on a contract.
pub trait PermissionChecker: Send + Sync {
    fn can(&self, actor_id: &str, action: Action, contract: &Contract) -> bool;
}

/// Grants every action to every actor. For local tooling only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn can(&self, _actor_id: &str, _action: Action, _contract: &Contract) -> bool {
        true
    }
}

/// Static actor → actions table, typically loaded from `[permissions]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantTable {
    grants: BTreeMap<String, BTreeSet<Action>>,
}

impl GrantTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `actions` to the grants held by `actor_id`.
    #[must_use]
    pub fn grant(mut self, actor_id: &str, actions: impl IntoIterator<Item = Action>) -> Self {
        self.grants
            .entry(actor_id.to_string())
            .or_default()
            .extend(actions);
        self
    }

    /// Build a table from action names as they appear in configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` naming the first unknown action.
    pub fn from_names(table: &BTreeMap<String, Vec<String>>) -> Result<Self, CoreError> {
        let mut grants = Self::new();
        for (actor, names) in table {
            let actions = names
                .iter()
                .map(|name| {
                    Action::from_name(name).ok_or_else(|| {
                        CoreError::Validation(format!("unknown action '{name}' for actor {actor}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            grants = grants.grant(actor, actions);
        }
        Ok(grants)
    }

    /// Actions granted to `actor_id`, including wildcard grants.
    #[must_use]
    pub fn actions_for(&self, actor_id: &str) -> BTreeSet<Action> {
        [actor_id, WILDCARD_ACTOR]
            .iter()
            .filter_map(|key| self.grants.get(*key))
            .flatten()
            .copied()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl PermissionChecker for GrantTable {
    fn can(&self, actor_id: &str, action: Action, _contract: &Contract) -> bool {
        [actor_id, WILDCARD_ACTOR]
            .iter()
            .any(|key| self.grants.get(*key).is_some_and(|set| set.contains(&action)))
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A committed lifecycle event, handed to the dispatcher after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleNotification {
    pub contract_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub from_status: Option<ContractStatus>,
    pub to_status: ContractStatus,
    pub comment: Option<String>,
}

/// Fire-and-forget delivery of lifecycle notifications.
///
/// `notify` must not block; the service calls it after the transaction has
/// committed and ignores delivery failures.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, notification: &LifecycleNotification);
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl NotificationDispatcher for NoopDispatcher {
    fn notify(&self, _notification: &LifecycleNotification) {}
}

/// Logs each notification at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn notify(&self, n: &LifecycleNotification) {
        tracing::info!(
            contract_id = %n.contract_id,
            actor_id = %n.actor_id,
            action = %n.action,
            to_status = %n.to_status,
            "lifecycle notification"
        );
    }
}

/// Forwards notifications into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<LifecycleNotification>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiving half of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationDispatcher for ChannelDispatcher {
    fn notify(&self, notification: &LifecycleNotification) {
        if self.tx.send(notification.clone()).is_err() {
            tracing::warn!(
                contract_id = %notification.contract_id,
                "notification receiver dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Counterparty;
    use chrono::Utc;

    fn contract() -> Contract {
        let now = Utc::now();
        Contract {
            id: "ctr-00000001".into(),
            title: "MSA".into(),
            status: ContractStatus::Draft,
            counterparty: Counterparty {
                name: "Initech".into(),
                email: None,
                organization: None,
            },
            amount_minor: None,
            currency: None,
            finance_review_requested: false,
            head_signoff_required: false,
            review_round: 0,
            latest_version: 1,
            row_version: 0,
            created_by: "usr-1".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn grant_table_checks_actor_and_wildcard() {
        let table = GrantTable::new()
            .grant("alice", [Action::ReviewLegal])
            .grant(WILDCARD_ACTOR, [Action::Submit]);
        let c = contract();
        assert!(table.can("alice", Action::ReviewLegal, &c));
        assert!(table.can("alice", Action::Submit, &c));
        assert!(table.can("bob", Action::Submit, &c));
        assert!(!table.can("bob", Action::ReviewLegal, &c));
        assert_eq!(
            table.actions_for("alice"),
            BTreeSet::from([Action::Submit, Action::ReviewLegal])
        );
    }

    #[test]
    fn grant_table_from_names_rejects_unknown() {
        let mut names = BTreeMap::new();
        names.insert("alice".to_string(), vec!["review_finance".to_string()]);
        let table = GrantTable::from_names(&names).unwrap();
        assert!(table.can("alice", Action::ReviewFinance, &contract()));

        names.insert("bob".to_string(), vec!["sign_everything".to_string()]);
        let err = GrantTable::from_names(&names).unwrap_err();
        assert!(err.to_string().contains("sign_everything"));
    }

    #[test]
    fn allow_all_allows() {
        assert!(AllowAll.can("anyone", Action::Terminate, &contract()));
    }

    #[tokio::test]
    async fn channel_dispatcher_forwards() {
        let (dispatcher, mut rx) = ChannelDispatcher::new();
        let n = LifecycleNotification {
            contract_id: "ctr-00000001".into(),
            actor_id: "alice".into(),
            action: AuditAction::Submitted,
            from_status: Some(ContractStatus::Draft),
            to_status: ContractStatus::InReview,
            comment: None,
        };
        dispatcher.notify(&n);
        assert_eq!(rx.recv().await, Some(n));
    }

    #[test]
    fn channel_dispatcher_survives_dropped_receiver() {
        let (dispatcher, rx) = ChannelDispatcher::new();
        drop(rx);
        dispatcher.notify(&LifecycleNotification {
            contract_id: "ctr-00000001".into(),
            actor_id: "alice".into(),
            action: AuditAction::Cancelled,
            from_status: Some(ContractStatus::Draft),
            to_status: ContractStatus::Cancelled,
            comment: Some("no longer needed".into()),
        });
    }
}
