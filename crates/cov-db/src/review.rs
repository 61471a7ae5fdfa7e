//! Internal review: submitting contracts, resolving approvals, and moving
//! legal review between authority levels.
//!
//! Every resolution re-folds the whole current round (see
//! [`cov_core::orchestrator::fold_round`]) instead of patching the status
//! incrementally, so the order in which tracks resolve never matters.

use chrono::Utc;
use serde_json::json;

use cov_core::approval_track::{ensure_can_open, ensure_pending, pending_for, relevel, require_text, resolve};
use cov_core::entities::{Approval, Contract};
use cov_core::enums::{Action, ApprovalState, AuditAction, LifecycleEvent, ReviewLevel, Track};
use cov_core::errors::CoreError;
use cov_core::orchestrator::{ReviewOutcome, fold_round};
use cov_core::state_machine::{ensure_not_terminal, transition};

use crate::error::DatabaseError;
use crate::repos::approval::{fetch_approval, fetch_approvals, open_approval, save_pending_approval};
use crate::repos::contract::fetch_contract;
use crate::service::{Change, LifecycleService};

/// Permission needed to resolve or relevel `approval`.
const fn review_action(approval: &Approval) -> Action {
    match (approval.track, approval.level) {
        (Track::Legal, ReviewLevel::Head) => Action::ReviewAsLegalHead,
        (track, _) => track.review_action(),
    }
}

/// The event a resolution to `outcome` on `track` feeds the state machine
/// when the contract can no longer take it.
const fn resolution_event(track: Track, outcome: ApprovalState) -> LifecycleEvent {
    match outcome {
        ApprovalState::Rejected => LifecycleEvent::Reject,
        ApprovalState::RevisionRequested => LifecycleEvent::RequestRevision,
        ApprovalState::Approved | ApprovalState::Pending => track.cleared_event(),
    }
}

impl LifecycleService {
    /// Send a draft (or a contract returned for revision) into review.
    ///
    /// Opens a pending approval for each required track in a new round,
    /// adopting any approval still pending from an earlier round.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the contract is in
    /// `draft` or `revision_requested`, or `CoreError::Unauthorized`.
    pub async fn submit(&self, contract_id: &str, actor_id: &str) -> Result<Contract, DatabaseError> {
        self.open_round(contract_id, actor_id, false).await
    }

    /// Send a rejected contract back into review with a fresh round.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the contract is
    /// `rejected`, or `CoreError::Unauthorized`.
    pub async fn resubmit(&self, contract_id: &str, actor_id: &str) -> Result<Contract, DatabaseError> {
        self.open_round(contract_id, actor_id, true).await
    }

    async fn open_round(
        &self,
        contract_id: &str,
        actor_id: &str,
        resubmit: bool,
    ) -> Result<Contract, DatabaseError> {
        let unit = self.begin(Some(contract_id)).await?;
        let result = async {
            let conn = unit.tx();
            let now = Utc::now();
            let contract = fetch_contract(conn, contract_id).await?;
            let (event, action, tag) = if resubmit {
                (LifecycleEvent::Resubmit, Action::Resubmit, AuditAction::Resubmitted)
            } else {
                (self.policy().submit_event(&contract), Action::Submit, AuditAction::Submitted)
            };
            ensure_not_terminal(&contract, event)?;
            let mut after = transition(&contract, event, now)?;
            self.authorize(actor_id, action, &contract)?;

            let round = contract.review_round + 1;
            let existing = fetch_approvals(conn, contract_id).await?;
            let tracks = self.policy().required_tracks(&contract);
            for &track in &tracks {
                match pending_for(&existing, track) {
                    Some(pending) => {
                        let adopted = Approval {
                            round,
                            ..pending.clone()
                        };
                        save_pending_approval(conn, &adopted).await?;
                    }
                    None => {
                        ensure_can_open(&existing, track)?;
                        open_approval(conn, contract_id, track, ReviewLevel::Manager, round, now)
                            .await?;
                    }
                }
            }
            after.review_round = round;

            let detail = json!({"round": round, "tracks": tracks});
            let (saved, event) = self
                .record(conn, &contract, after, Change::new(actor_id, tag).detail(detail))
                .await?;
            Ok::<_, DatabaseError>((saved, event))
        }
        .await;

        let (contract, event) = unit.finish(result).await?;
        self.dispatch(&event);
        Ok(contract)
    }

    /// Approve a pending approval and re-fold the round.
    ///
    /// When every required track has approved but head-level legal sign-off
    /// is still owed, a head-level legal approval is opened in the same round
    /// and the contract moves to `pending_legal_head`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidApprovalState` if the approval is already
    /// resolved, `CoreError::InvalidTransition` if the contract is not under
    /// review, or `CoreError::Unauthorized`.
    pub async fn approve(
        &self,
        approval_id: &str,
        actor_id: &str,
        comment: Option<&str>,
    ) -> Result<Contract, DatabaseError> {
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        self.resolve_approval(approval_id, actor_id, ApprovalState::Approved, comment)
            .await
    }

    /// Reject a pending approval; the contract becomes `rejected`.
    ///
    /// Other pending approvals stay pending but are no longer actionable.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty comment, plus everything
    /// [`Self::approve`] returns.
    pub async fn reject(
        &self,
        approval_id: &str,
        actor_id: &str,
        comment: &str,
    ) -> Result<Contract, DatabaseError> {
        let comment = require_text(Some(comment), "comment", 1)?;
        self.resolve_approval(approval_id, actor_id, ApprovalState::Rejected, Some(comment))
            .await
    }

    /// Send the contract back for revision. The next submit opens a new round.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty comment, plus everything
    /// [`Self::approve`] returns.
    pub async fn request_revision(
        &self,
        approval_id: &str,
        actor_id: &str,
        comment: &str,
    ) -> Result<Contract, DatabaseError> {
        let comment = require_text(Some(comment), "comment", 1)?;
        self.resolve_approval(
            approval_id,
            actor_id,
            ApprovalState::RevisionRequested,
            Some(comment),
        )
        .await
    }

    async fn resolve_approval(
        &self,
        approval_id: &str,
        actor_id: &str,
        outcome: ApprovalState,
        comment: Option<&str>,
    ) -> Result<Contract, DatabaseError> {
        let contract_id = self.get_approval(approval_id).await?.contract_id;

        let unit = self.begin(Some(&contract_id)).await?;
        let result = async {
            let conn = unit.tx();
            let now = Utc::now();
            let approval = fetch_approval(conn, approval_id).await?;
            let contract = fetch_contract(conn, &contract_id).await?;

            let attempted = resolution_event(approval.track, outcome);
            ensure_not_terminal(&contract, attempted)?;
            ensure_pending(&approval)?;
            if !contract.status.is_under_review() {
                return Err(CoreError::InvalidTransition {
                    contract_id: contract.id.clone(),
                    from: contract.status,
                    event: attempted,
                }
                .into());
            }
            if approval.round != contract.review_round {
                return Err(CoreError::InvalidApprovalState {
                    approval_id: approval.id.clone(),
                    state: approval.state,
                }
                .into());
            }
            self.authorize(actor_id, review_action(&approval), &contract)?;

            let resolved = resolve(&approval, outcome, actor_id, comment, now)?;
            save_pending_approval(conn, &resolved).await?;

            let round: Vec<Approval> = fetch_approvals(conn, &contract_id)
                .await?
                .into_iter()
                .filter(|a| a.round == contract.review_round)
                .collect();
            let folded = fold_round(
                &self.policy().required_tracks(&contract),
                &round,
                self.policy().head_signoff_mandatory(&contract),
            );
            let after = match folded.event_from(contract.status) {
                Some(event) => transition(&contract, event, now)?,
                None => Contract {
                    updated_at: now,
                    ..contract.clone()
                },
            };

            let head = if folded == ReviewOutcome::NeedsHeadSignoff {
                Some(
                    open_approval(
                        conn,
                        &contract_id,
                        Track::Legal,
                        ReviewLevel::Head,
                        after.review_round,
                        now,
                    )
                    .await?,
                )
            } else {
                None
            };

            let tag = match outcome {
                ApprovalState::Rejected => AuditAction::rejected(approval.track),
                ApprovalState::RevisionRequested => AuditAction::RevisionRequested,
                ApprovalState::Approved | ApprovalState::Pending => {
                    AuditAction::approved(approval.track, approval.level)
                }
            };
            let mut detail = json!({
                "approval_id": resolved.id,
                "track": resolved.track,
                "level": resolved.level,
                "round": resolved.round,
            });
            if let Some(head) = &head {
                detail["head_approval_id"] = json!(head.id);
            }
            self.record(
                conn,
                &contract,
                after,
                Change::new(actor_id, tag).comment(comment).detail(detail),
            )
            .await
        }
        .await;

        let (contract, event) = unit.finish(result).await?;
        self.dispatch(&event);
        Ok(contract)
    }

    /// Move the pending legal review up to the head of legal.
    ///
    /// The approval stays pending at head level; nothing is resolved.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty reason,
    /// `CoreError::InvalidTransition` if the status does not allow escalation
    /// or no legal approval is pending, `CoreError::InvalidApprovalState` if
    /// legal review is already at head level, or `CoreError::Unauthorized`.
    pub async fn escalate(
        &self,
        contract_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<Contract, DatabaseError> {
        let reason = require_text(Some(reason), "reason", 1)?;

        let unit = self.begin(Some(contract_id)).await?;
        let result = async {
            let conn = unit.tx();
            let now = Utc::now();
            let contract = fetch_contract(conn, contract_id).await?;
            ensure_not_terminal(&contract, LifecycleEvent::Escalate)?;
            let after = transition(&contract, LifecycleEvent::Escalate, now)?;

            let approvals = fetch_approvals(conn, contract_id).await?;
            let legal = pending_for(&approvals, Track::Legal).ok_or_else(|| {
                CoreError::InvalidTransition {
                    contract_id: contract.id.clone(),
                    from: contract.status,
                    event: LifecycleEvent::Escalate,
                }
            })?;
            if legal.level == ReviewLevel::Head {
                return Err(CoreError::InvalidApprovalState {
                    approval_id: legal.id.clone(),
                    state: legal.state,
                }
                .into());
            }
            self.authorize(actor_id, Action::Escalate, &contract)?;

            let escalated = relevel(legal, ReviewLevel::Head)?;
            save_pending_approval(conn, &escalated).await?;

            let change = Change::new(actor_id, AuditAction::Escalated)
                .comment(Some(reason))
                .detail(json!({"approval_id": escalated.id}));
            self.record(conn, &contract, after, change).await
        }
        .await;

        let (contract, event) = unit.finish(result).await?;
        self.dispatch(&event);
        Ok(contract)
    }

    /// Hand a head-level legal review back to manager level.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty comment,
    /// `CoreError::InvalidTransition` unless the contract is
    /// `pending_legal_head`, `CoreError::InvalidApprovalState` unless the
    /// approval is a pending head-level legal approval, or
    /// `CoreError::Unauthorized` without `review_as_legal_head`.
    pub async fn return_to_manager(
        &self,
        approval_id: &str,
        actor_id: &str,
        comment: &str,
    ) -> Result<Contract, DatabaseError> {
        let comment = require_text(Some(comment), "comment", 1)?;
        let contract_id = self.get_approval(approval_id).await?.contract_id;

        let unit = self.begin(Some(&contract_id)).await?;
        let result = async {
            let conn = unit.tx();
            let now = Utc::now();
            let approval = fetch_approval(conn, approval_id).await?;
            let contract = fetch_contract(conn, &contract_id).await?;
            ensure_not_terminal(&contract, LifecycleEvent::ReturnToManager)?;
            ensure_pending(&approval)?;
            if approval.track != Track::Legal || approval.level != ReviewLevel::Head {
                return Err(CoreError::InvalidApprovalState {
                    approval_id: approval.id.clone(),
                    state: approval.state,
                }
                .into());
            }
            let after = transition(&contract, LifecycleEvent::ReturnToManager, now)?;
            self.authorize(actor_id, Action::ReviewAsLegalHead, &contract)?;

            let returned = relevel(&approval, ReviewLevel::Manager)?;
            save_pending_approval(conn, &returned).await?;

            let change = Change::new(actor_id, AuditAction::ReturnedToManager)
                .comment(Some(comment))
                .detail(json!({"approval_id": returned.id}));
            self.record(conn, &contract, after, change).await
        }
        .await;

        let (contract, event) = unit.finish(result).await?;
        self.dispatch(&event);
        Ok(contract)
    }

    /// Reopen a contract returned for revision as a draft.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the contract is
    /// `revision_requested`, or `CoreError::Unauthorized` without
    /// `edit_content`.
    pub async fn revise_draft(&self, contract_id: &str, actor_id: &str) -> Result<Contract, DatabaseError> {
        self.apply_event(
            contract_id,
            LifecycleEvent::ReviseDraft,
            Action::EditContent,
            Change::new(actor_id, AuditAction::DraftReopened),
        )
        .await
    }
}
