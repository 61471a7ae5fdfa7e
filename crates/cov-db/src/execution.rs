//! Execution and exit paths: counterparty signature, activation,
//! cancellation, and the external expiry/termination triggers. Also the
//! available-action query callers render instead of re-deriving status checks.

use std::collections::BTreeSet;

use serde_json::json;

use cov_core::actions::{ActorCapabilities, AvailableAction, compute_available_actions};
use cov_core::approval_track::require_text;
use cov_core::entities::Contract;
use cov_core::enums::{Action, AuditAction, LifecycleEvent};
use cov_core::errors::CoreError;

use crate::error::DatabaseError;
use crate::repos::approval::fetch_approvals;
use crate::repos::contract::fetch_contract;
use crate::service::{Change, LifecycleService};

/// Loose shape check: `local@domain.tld`, no whitespace.
fn is_email_like(recipient: &str) -> bool {
    if recipient.chars().any(char::is_whitespace) {
        return false;
    }
    match recipient.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
        }
        None => false,
    }
}

/// Trim recipients and check each one.
///
/// # Errors
///
/// Returns `CoreError::Validation` for an empty list or a malformed address.
pub fn validate_recipients(recipients: &[String]) -> Result<Vec<String>, CoreError> {
    if recipients.is_empty() {
        return Err(CoreError::Validation("at least one recipient is required".into()));
    }
    recipients
        .iter()
        .map(|r| {
            let r = r.trim();
            if is_email_like(r) {
                Ok(r.to_string())
            } else {
                Err(CoreError::Validation(format!(
                    "recipient '{r}' is not an email address"
                )))
            }
        })
        .collect()
}

/// Trim an optional comment, treating blank as absent.
fn optional(comment: Option<&str>) -> Option<&str> {
    comment.map(str::trim).filter(|c| !c.is_empty())
}

impl LifecycleService {
    /// Cancel a contract from any non-terminal status.
    ///
    /// The reason is checked before anything is read: after trimming it must
    /// be at least `min_cancel_reason_len` characters.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for a short reason,
    /// `CoreError::InvalidTransition` for a terminal contract, or
    /// `CoreError::Unauthorized`.
    pub async fn cancel(
        &self,
        contract_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<Contract, DatabaseError> {
        let reason = require_text(Some(reason), "reason", self.policy().min_cancel_reason_len)?;
        self.apply_event(
            contract_id,
            LifecycleEvent::Cancel,
            Action::Cancel,
            Change::new(actor_id, AuditAction::Cancelled).comment(Some(reason)),
        )
        .await
    }

    /// Send an approved contract out for signature.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for missing or malformed recipients,
    /// `CoreError::InvalidTransition` unless the contract is `approved`, or
    /// `CoreError::Unauthorized`.
    pub async fn send_to_counterparty(
        &self,
        contract_id: &str,
        actor_id: &str,
        recipients: &[String],
    ) -> Result<Contract, DatabaseError> {
        let recipients = validate_recipients(recipients)?;
        self.apply_event(
            contract_id,
            LifecycleEvent::SendToCounterparty,
            Action::SendToCounterparty,
            Change::new(actor_id, AuditAction::SentToCounterparty)
                .detail(json!({"recipients": recipients})),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the contract is
    /// `sent_to_counterparty`, or `CoreError::Unauthorized`.
    pub async fn record_countersignature(
        &self,
        contract_id: &str,
        actor_id: &str,
        comment: Option<&str>,
    ) -> Result<Contract, DatabaseError> {
        self.apply_event(
            contract_id,
            LifecycleEvent::Countersign,
            Action::RecordCountersignature,
            Change::new(actor_id, AuditAction::Countersigned).comment(optional(comment)),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the contract is
    /// `countersigned`, or `CoreError::Unauthorized`.
    pub async fn activate(
        &self,
        contract_id: &str,
        actor_id: &str,
        comment: Option<&str>,
    ) -> Result<Contract, DatabaseError> {
        self.apply_event(
            contract_id,
            LifecycleEvent::Activate,
            Action::Activate,
            Change::new(actor_id, AuditAction::Activated).comment(optional(comment)),
        )
        .await
    }

    /// External trigger: the contract lapsed before it became active.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the contract is
    /// `approved`, `sent_to_counterparty`, or `countersigned`, or
    /// `CoreError::Unauthorized`.
    pub async fn expire(
        &self,
        contract_id: &str,
        actor_id: &str,
        comment: Option<&str>,
    ) -> Result<Contract, DatabaseError> {
        self.apply_event(
            contract_id,
            LifecycleEvent::Expire,
            Action::Expire,
            Change::new(actor_id, AuditAction::Expired).comment(optional(comment)),
        )
        .await
    }

    /// External trigger: execution was terminated after the contract went out.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty reason,
    /// `CoreError::InvalidTransition` unless the contract is
    /// `sent_to_counterparty` or `countersigned`, or `CoreError::Unauthorized`.
    pub async fn terminate(
        &self,
        contract_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<Contract, DatabaseError> {
        let reason = require_text(Some(reason), "reason", 1)?;
        self.apply_event(
            contract_id,
            LifecycleEvent::Terminate,
            Action::Terminate,
            Change::new(actor_id, AuditAction::Terminated).comment(Some(reason)),
        )
        .await
    }

    /// What `actor_id` may attempt next on the contract.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the contract does not exist.
    pub async fn available_actions(
        &self,
        contract_id: &str,
        actor_id: &str,
    ) -> Result<BTreeSet<AvailableAction>, DatabaseError> {
        let (contract, approvals) = {
            let _gate = self.read_gate().await;
            let conn = self.db().conn();
            let contract = fetch_contract(conn, contract_id).await?;
            let approvals = fetch_approvals(conn, contract_id).await?;
            (contract, approvals)
        };
        let caps = ActorCapabilities::resolve(self.permissions(), actor_id, &contract);
        Ok(compute_available_actions(&contract, &approvals, &caps))
    }
}
