//! Helpers shared by the cov-db integration tests.
#![allow(dead_code)]

use cov_core::entities::{Approval, Contract, NewContract};
use cov_core::enums::{ContractStatus, Track};
use cov_core::orchestrator::ApprovalPolicy;
use cov_db::CovDb;
use cov_db::service::LifecycleService;

pub const AUTHOR: &str = "usr-alice";
pub const LEGAL: &str = "usr-legal";
pub const FINANCE: &str = "usr-finance";
pub const HEAD: &str = "usr-head";

pub async fn memory_service() -> LifecycleService {
    let db = CovDb::open_local(":memory:").await.unwrap();
    LifecycleService::from_db(db, ApprovalPolicy::default())
}

/// Legal review only.
pub fn small_contract() -> NewContract {
    NewContract::new("Mutual NDA", "Acme GmbH")
}

/// Over the default finance threshold: legal and finance review.
pub fn large_contract() -> NewContract {
    NewContract::new("Master services agreement", "Globex Corp").with_amount(12_000_000, "EUR")
}

pub async fn pending(svc: &LifecycleService, contract_id: &str, track: Track) -> Approval {
    svc.list_approvals(contract_id)
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.track == track && a.is_pending())
        .unwrap_or_else(|| panic!("no pending {track} approval on {contract_id}"))
}

/// Create a contract and walk it to `status` through the public operations.
pub async fn drive_to(svc: &LifecycleService, status: ContractStatus) -> Contract {
    use ContractStatus as S;

    let input = match status {
        S::InReview | S::FinanceReviewInProgress => large_contract(),
        _ => small_contract(),
    };
    let contract = svc
        .create_contract(AUTHOR, &input, b"Clause one.\n\nClause two.".to_vec())
        .await
        .unwrap();
    let id = contract.id.clone();
    if status == S::Draft {
        return contract;
    }

    let submitted = svc.submit(&id, AUTHOR).await.unwrap();
    match status {
        S::InReview | S::LegalReviewInProgress => submitted,
        S::FinanceReviewInProgress => {
            let legal = pending(svc, &id, Track::Legal).await;
            svc.approve(&legal.id, LEGAL, None).await.unwrap()
        }
        S::PendingLegalHead => svc.escalate(&id, LEGAL, "Non-standard liability").await.unwrap(),
        S::RevisionRequested => {
            let legal = pending(svc, &id, Track::Legal).await;
            svc.request_revision(&legal.id, LEGAL, "Fix the parties block")
                .await
                .unwrap()
        }
        S::Rejected => {
            let legal = pending(svc, &id, Track::Legal).await;
            svc.reject(&legal.id, LEGAL, "Not acceptable").await.unwrap()
        }
        S::Approved | S::SentToCounterparty | S::Countersigned | S::Active => {
            let legal = pending(svc, &id, Track::Legal).await;
            let approved = svc.approve(&legal.id, LEGAL, None).await.unwrap();
            if status == S::Approved {
                return approved;
            }
            let sent = svc
                .send_to_counterparty(&id, AUTHOR, &["legal@acme.example".into()])
                .await
                .unwrap();
            if status == S::SentToCounterparty {
                return sent;
            }
            let signed = svc.record_countersignature(&id, AUTHOR, None).await.unwrap();
            if status == S::Countersigned {
                return signed;
            }
            svc.activate(&id, AUTHOR, None).await.unwrap()
        }
        S::Cancelled => svc.cancel(&id, AUTHOR, "Deal fell through").await.unwrap(),
        S::Draft | S::Expired | S::Terminated => {
            panic!("drive_to does not reach {status}")
        }
    }
}
