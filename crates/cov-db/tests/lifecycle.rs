//! End-to-end lifecycle scenarios through `LifecycleService`.

mod common;

use std::sync::Arc;

use cov_core::collaborators::{ChannelDispatcher, GrantTable};
use cov_core::entities::NewContract;
use cov_core::enums::{Action, ApprovalState, AuditAction, ContractStatus, ReviewLevel, Track};
use cov_core::errors::CoreError;
use cov_db::repos::audit::AuditFilter;
use pretty_assertions::assert_eq;

use common::{AUTHOR, FINANCE, HEAD, LEGAL, large_contract, memory_service, pending, small_contract};

#[tokio::test]
async fn reject_records_one_audit_entry() {
    let svc = memory_service().await;
    let contract = svc
        .create_contract(AUTHOR, &small_contract(), b"Clause.".to_vec())
        .await
        .unwrap();
    let submitted = svc.submit(&contract.id, AUTHOR).await.unwrap();
    assert_eq!(submitted.status, ContractStatus::LegalReviewInProgress);

    let legal = pending(&svc, &contract.id, Track::Legal).await;
    let before = svc.contract_history(&contract.id).await.unwrap().len();
    let rejected = svc
        .reject(&legal.id, LEGAL, "Indemnity is uncapped")
        .await
        .unwrap();
    assert_eq!(rejected.status, ContractStatus::Rejected);

    let approval = svc.get_approval(&legal.id).await.unwrap();
    assert_eq!(approval.state, ApprovalState::Rejected);
    assert_eq!(approval.comment.as_deref(), Some("Indemnity is uncapped"));

    let history = svc.contract_history(&contract.id).await.unwrap();
    assert_eq!(history.len(), before + 1);
    let entry = history.last().unwrap();
    assert_eq!(entry.action, AuditAction::LegalRejected);
    assert_eq!(entry.from_status, Some(ContractStatus::LegalReviewInProgress));
    assert_eq!(entry.to_status, ContractStatus::Rejected);
    assert_eq!(entry.actor_id, LEGAL);
}

#[tokio::test]
async fn track_order_does_not_change_the_outcome() {
    let svc = memory_service().await;

    let a = svc.create_contract(AUTHOR, &large_contract(), Vec::new()).await.unwrap();
    let b = svc.create_contract(AUTHOR, &large_contract(), Vec::new()).await.unwrap();
    for id in [&a.id, &b.id] {
        assert_eq!(svc.submit(id, AUTHOR).await.unwrap().status, ContractStatus::InReview);
    }

    let a_legal = pending(&svc, &a.id, Track::Legal).await;
    let a_finance = pending(&svc, &a.id, Track::Finance).await;
    let mid_a = svc.approve(&a_legal.id, LEGAL, None).await.unwrap();
    assert_eq!(mid_a.status, ContractStatus::FinanceReviewInProgress);
    let end_a = svc.approve(&a_finance.id, FINANCE, Some("Budget ok")).await.unwrap();

    let b_legal = pending(&svc, &b.id, Track::Legal).await;
    let b_finance = pending(&svc, &b.id, Track::Finance).await;
    let mid_b = svc.approve(&b_finance.id, FINANCE, None).await.unwrap();
    assert_eq!(mid_b.status, ContractStatus::LegalReviewInProgress);
    let end_b = svc.approve(&b_legal.id, LEGAL, None).await.unwrap();

    assert_eq!(end_a.status, ContractStatus::Approved);
    assert_eq!(end_b.status, end_a.status);

    let err = svc.approve(&a_legal.id, LEGAL, None).await.unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(CoreError::InvalidApprovalState { .. })
    ));
}

#[tokio::test]
async fn mandatory_head_signoff_opens_a_head_approval() {
    let svc = memory_service().await;
    let input = NewContract::new("Joint venture", "Initech").with_head_signoff();
    let contract = svc.create_contract(AUTHOR, &input, Vec::new()).await.unwrap();
    svc.submit(&contract.id, AUTHOR).await.unwrap();

    let manager = pending(&svc, &contract.id, Track::Legal).await;
    let waiting = svc.approve(&manager.id, LEGAL, None).await.unwrap();
    assert_eq!(waiting.status, ContractStatus::PendingLegalHead);

    let head = pending(&svc, &contract.id, Track::Legal).await;
    assert_ne!(head.id, manager.id);
    assert_eq!(head.level, ReviewLevel::Head);
    assert_eq!(head.round, waiting.review_round);

    let history = svc.contract_history(&contract.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.action, AuditAction::LegalApproved);
    assert_eq!(last.to_status, ContractStatus::PendingLegalHead);
    let detail = last.detail.as_ref().unwrap();
    assert_eq!(detail["approval_id"], manager.id.as_str());
    assert_eq!(detail["head_approval_id"], head.id.as_str());
    // One entry per transition: submit, then the manager approval.
    let since_submit = history
        .iter()
        .skip_while(|e| e.action != AuditAction::Submitted)
        .count();
    assert_eq!(since_submit, 2);

    let approved = svc.approve(&head.id, HEAD, None).await.unwrap();
    assert_eq!(approved.status, ContractStatus::Approved);
    let last = svc.contract_history(&contract.id).await.unwrap().pop().unwrap();
    assert_eq!(last.action, AuditAction::LegalHeadApproved);
}

#[tokio::test]
async fn revision_round_supersedes_previous_approvals() {
    let svc = memory_service().await;
    let contract = svc.create_contract(AUTHOR, &large_contract(), Vec::new()).await.unwrap();
    svc.submit(&contract.id, AUTHOR).await.unwrap();

    let finance = pending(&svc, &contract.id, Track::Finance).await;
    let legal = pending(&svc, &contract.id, Track::Legal).await;
    let returned = svc
        .request_revision(&legal.id, LEGAL, "Clarify termination notice")
        .await
        .unwrap();
    assert_eq!(returned.status, ContractStatus::RevisionRequested);
    // The finance approval is untouched and stays pending.
    assert!(svc.get_approval(&finance.id).await.unwrap().is_pending());

    let resubmitted = svc.submit(&contract.id, AUTHOR).await.unwrap();
    assert_eq!(resubmitted.status, ContractStatus::InReview);
    assert_eq!(resubmitted.review_round, 2);

    let approvals = svc.list_approvals(&contract.id).await.unwrap();
    assert_eq!(approvals.len(), 3);
    let adopted = svc.get_approval(&finance.id).await.unwrap();
    assert_eq!(adopted.round, 2);
    assert!(adopted.is_pending());
    let old = svc.get_approval(&legal.id).await.unwrap();
    assert_eq!(old.state, ApprovalState::RevisionRequested);
    assert_eq!(old.round, 1);

    let fresh = pending(&svc, &contract.id, Track::Legal).await;
    assert_eq!(fresh.round, 2);
    svc.approve(&fresh.id, LEGAL, None).await.unwrap();
    let approved = svc.approve(&finance.id, FINANCE, None).await.unwrap();
    assert_eq!(approved.status, ContractStatus::Approved);
}

#[tokio::test]
async fn rejected_contract_can_be_resubmitted_once_per_rejection() {
    let svc = memory_service().await;
    let contract = svc.create_contract(AUTHOR, &small_contract(), Vec::new()).await.unwrap();
    svc.submit(&contract.id, AUTHOR).await.unwrap();
    let legal = pending(&svc, &contract.id, Track::Legal).await;
    svc.reject(&legal.id, LEGAL, "Wrong counterparty").await.unwrap();

    let err = svc.submit(&contract.id, AUTHOR).await.unwrap_err();
    assert!(matches!(err.domain(), Some(CoreError::InvalidTransition { .. })));

    let again = svc.resubmit(&contract.id, AUTHOR).await.unwrap();
    assert_eq!(again.status, ContractStatus::InReview);
    assert_eq!(again.review_round, 2);
    let fresh = pending(&svc, &contract.id, Track::Legal).await;
    assert_eq!(fresh.round, 2);

    let err = svc.resubmit(&contract.id, AUTHOR).await.unwrap_err();
    assert!(matches!(err.domain(), Some(CoreError::InvalidTransition { .. })));
}

#[tokio::test]
async fn terminal_contract_rejects_version_and_approval_changes() {
    let svc = memory_service().await;
    let contract = svc.create_contract(AUTHOR, &small_contract(), Vec::new()).await.unwrap();
    svc.submit(&contract.id, AUTHOR).await.unwrap();
    let legal = pending(&svc, &contract.id, Track::Legal).await;
    svc.cancel(&contract.id, AUTHOR, "Business no longer needed")
        .await
        .unwrap();

    let err = svc
        .create_version(&contract.id, AUTHOR, b"late edit".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(CoreError::ContractTerminal {
            status: ContractStatus::Cancelled,
            ..
        })
    ));

    let err = svc.approve(&legal.id, LEGAL, None).await.unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(CoreError::InvalidTransition {
            from: ContractStatus::Cancelled,
            ..
        })
    ));
    assert!(svc.get_approval(&legal.id).await.unwrap().is_pending());
}

#[tokio::test]
async fn permission_denial_leaves_no_trace() {
    let grants = GrantTable::new()
        .grant(AUTHOR, [Action::Submit, Action::EditContent, Action::Cancel])
        .grant(LEGAL, [Action::ReviewLegal, Action::Escalate])
        .grant(HEAD, [Action::ReviewAsLegalHead]);
    let svc = memory_service().await.with_permissions(Arc::new(grants));

    let contract = svc.create_contract(AUTHOR, &small_contract(), Vec::new()).await.unwrap();
    let err = svc.submit(&contract.id, LEGAL).await.unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(CoreError::Unauthorized {
            action: Action::Submit,
            ..
        })
    ));
    svc.submit(&contract.id, AUTHOR).await.unwrap();

    let legal = pending(&svc, &contract.id, Track::Legal).await;
    let before = svc.get_contract(&contract.id).await.unwrap();
    let history_len = svc.contract_history(&contract.id).await.unwrap().len();

    let err = svc.approve(&legal.id, AUTHOR, None).await.unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(CoreError::Unauthorized {
            action: Action::ReviewLegal,
            ..
        })
    ));
    assert_eq!(svc.get_contract(&contract.id).await.unwrap(), before);
    assert_eq!(svc.contract_history(&contract.id).await.unwrap().len(), history_len);
    assert!(svc.get_approval(&legal.id).await.unwrap().is_pending());

    svc.escalate(&contract.id, LEGAL, "Needs head review").await.unwrap();
    let err = svc
        .return_to_manager(&legal.id, LEGAL, "Back to you")
        .await
        .unwrap_err();
    assert!(matches!(err.domain(), Some(CoreError::Unauthorized { .. })));
    let approved = svc.approve(&legal.id, HEAD, None).await.unwrap();
    assert_eq!(approved.status, ContractStatus::Approved);
}

#[tokio::test]
async fn notifications_follow_commits_only() {
    let (dispatcher, mut rx) = ChannelDispatcher::new();
    let svc = memory_service().await.with_dispatcher(Arc::new(dispatcher));

    let contract = svc.create_contract(AUTHOR, &small_contract(), Vec::new()).await.unwrap();
    svc.submit(&contract.id, AUTHOR).await.unwrap();
    assert!(svc.cancel(&contract.id, AUTHOR, "short").await.is_err());

    let created = rx.recv().await.unwrap();
    assert_eq!(created.action, AuditAction::Created);
    assert_eq!(created.from_status, None);
    let submitted = rx.recv().await.unwrap();
    assert_eq!(submitted.action, AuditAction::Submitted);
    assert_eq!(submitted.to_status, ContractStatus::LegalReviewInProgress);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn statuses_roundtrip_through_storage() {
    let svc = memory_service().await;
    let contract = svc.create_contract(AUTHOR, &large_contract(), Vec::new()).await.unwrap();
    let mut results = vec![svc.submit(&contract.id, AUTHOR).await.unwrap()];
    let legal = pending(&svc, &contract.id, Track::Legal).await;
    results.push(svc.escalate(&contract.id, LEGAL, "Cross-border data").await.unwrap());
    results.push(svc.approve(&legal.id, HEAD, None).await.unwrap());

    for result in results {
        assert!(ContractStatus::ALL.contains(&result.status));
    }
    let stored = svc.get_contract(&contract.id).await.unwrap();
    assert_eq!(stored.status, ContractStatus::FinanceReviewInProgress);

    let entries = svc
        .query_audit(&AuditFilter {
            contract_id: Some(contract.id.clone()),
            action: Some(AuditAction::LegalHeadApproved),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].to_status, stored.status);
}
