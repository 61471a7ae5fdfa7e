//! Cancellation from every non-terminal status, and reason validation.

mod common;

use cov_core::enums::{AuditAction, ContractStatus};
use cov_core::errors::CoreError;
use pretty_assertions::assert_eq;
use rstest::rstest;

use common::{AUTHOR, drive_to, memory_service};

#[rstest]
#[case::draft(ContractStatus::Draft)]
#[case::in_review(ContractStatus::InReview)]
#[case::legal_review(ContractStatus::LegalReviewInProgress)]
#[case::finance_review(ContractStatus::FinanceReviewInProgress)]
#[case::pending_legal_head(ContractStatus::PendingLegalHead)]
#[case::revision_requested(ContractStatus::RevisionRequested)]
#[case::approved(ContractStatus::Approved)]
#[case::sent(ContractStatus::SentToCounterparty)]
#[case::countersigned(ContractStatus::Countersigned)]
#[tokio::test]
async fn cancel_from_non_terminal_status(#[case] status: ContractStatus) {
    let svc = memory_service().await;
    let contract = drive_to(&svc, status).await;
    assert_eq!(contract.status, status);

    let cancelled = svc
        .cancel(&contract.id, AUTHOR, "acceptable reason")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ContractStatus::Cancelled);

    let last = svc.contract_history(&contract.id).await.unwrap().pop().unwrap();
    assert_eq!(last.action, AuditAction::Cancelled);
    assert_eq!(last.from_status, Some(status));
    assert_eq!(last.comment.as_deref(), Some("acceptable reason"));
}

#[rstest]
#[case::active(ContractStatus::Active)]
#[case::rejected(ContractStatus::Rejected)]
#[case::cancelled(ContractStatus::Cancelled)]
#[tokio::test]
async fn cancel_from_terminal_status_is_invalid(#[case] status: ContractStatus) {
    let svc = memory_service().await;
    let contract = drive_to(&svc, status).await;
    let err = svc
        .cancel(&contract.id, AUTHOR, "acceptable reason")
        .await
        .unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(CoreError::InvalidTransition { from, .. }) if *from == status
    ));
}

#[rstest]
#[case::short("short")]
#[case::blank("          ")]
#[case::padded("   nine ch   ")]
#[tokio::test]
async fn short_reasons_are_rejected_before_any_write(#[case] reason: &str) {
    let svc = memory_service().await;
    let contract = drive_to(&svc, ContractStatus::Draft).await;
    let err = svc.cancel(&contract.id, AUTHOR, reason).await.unwrap_err();
    assert!(matches!(err.domain(), Some(CoreError::Validation(_))));
    assert_eq!(
        svc.get_contract(&contract.id).await.unwrap().status,
        ContractStatus::Draft
    );
}

#[tokio::test]
async fn reason_at_minimum_length_is_accepted() {
    let svc = memory_service().await;
    let contract = drive_to(&svc, ContractStatus::Draft).await;
    let cancelled = svc.cancel(&contract.id, AUTHOR, "ten chars!").await.unwrap();
    assert_eq!(cancelled.status, ContractStatus::Cancelled);
}

#[tokio::test]
async fn cancel_of_unknown_contract_is_not_found() {
    let svc = memory_service().await;
    let err = svc
        .cancel("ctr-00000000", AUTHOR, "acceptable reason")
        .await
        .unwrap_err();
    assert!(matches!(err.domain(), Some(CoreError::NotFound { .. })));
}
