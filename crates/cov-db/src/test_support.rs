//! Shared test utilities for cov-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use cov_core::entities::{Approval, Contract, NewContract};
    use cov_core::enums::Track;
    use cov_core::orchestrator::ApprovalPolicy;

    use crate::CovDb;
    use crate::service::LifecycleService;

    /// In-memory service with default policy and permissive collaborators.
    pub async fn test_service() -> LifecycleService {
        let db = CovDb::open_local(":memory:").await.unwrap();
        LifecycleService::from_db(db, ApprovalPolicy::default())
    }

    /// A contract below the finance threshold: legal review only.
    pub fn sample_contract() -> NewContract {
        NewContract::new("Mutual NDA", "Acme GmbH")
    }

    /// The pending approval on `track`.
    pub async fn pending(svc: &LifecycleService, contract_id: &str, track: Track) -> Approval {
        svc.list_approvals(contract_id)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.track == track && a.is_pending())
            .unwrap_or_else(|| panic!("no pending {track} approval on {contract_id}"))
    }

    /// Create, submit and approve a single-track contract.
    pub async fn approved_contract(svc: &LifecycleService) -> Contract {
        let contract = svc
            .create_contract("usr-alice", &sample_contract(), b"Clause one.".to_vec())
            .await
            .unwrap();
        svc.submit(&contract.id, "usr-alice").await.unwrap();
        let legal = pending(svc, &contract.id, Track::Legal).await;
        svc.approve(&legal.id, "usr-legal", None).await.unwrap()
    }
}
