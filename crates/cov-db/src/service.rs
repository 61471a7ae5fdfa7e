//! The lifecycle service: the only entry point callers use.
//!
//! `LifecycleService` wraps `CovDb` (raw database access), the injected
//! permission checker and notification dispatcher, and the approval policy.
//! Operations are implemented as `impl LifecycleService` blocks in
//! [`crate::repos`], [`crate::review`] and [`crate::execution`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cov_config::CovenantConfig;
use cov_core::collaborators::{
    AllowAll, LifecycleNotification, NoopDispatcher, NotificationDispatcher, PermissionChecker,
};
use cov_core::entities::{AuditLogEntry, Contract};
use cov_core::enums::{Action, AuditAction, ContractStatus, LifecycleEvent};
use cov_core::errors::CoreError;
use cov_core::ids::PREFIX_AUDIT;
use cov_core::orchestrator::ApprovalPolicy;
use cov_core::state_machine::{ensure_not_terminal, transition};
use libsql::{Transaction, TransactionBehavior};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::DatabaseError;
use crate::locks::{ContractGuard, ContractLocks};
use crate::repos::audit::insert_audit;
use crate::repos::contract::{fetch_contract, update_contract};
use crate::{CovDb, generate_id};

/// Orchestrates lifecycle mutations with audit and notifications.
///
/// Every mutation method follows this protocol:
/// 1. Validate boundary input
/// 2. Acquire the contract's lock, then the connection gate (version appends
///    compute their changelog between the two)
/// 3. Begin an IMMEDIATE transaction and re-read the contract
/// 4. Terminal check, then permission check
/// 5. Write, compare-and-swap the contract row, append audit
/// 6. Commit, release locks, dispatch the notification
pub struct LifecycleService {
    db: CovDb,
    permissions: Arc<dyn PermissionChecker>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    policy: ApprovalPolicy,
    locks: ContractLocks,
    /// The connection runs one transaction at a time.
    gate: Mutex<()>,
}

/// One open unit of work: the locks it holds and its transaction.
pub(crate) struct Unit<'a> {
    tx: Transaction,
    _gate: MutexGuard<'a, ()>,
    _contract: Option<ContractGuard>,
}

impl Unit<'_> {
    pub(crate) const fn tx(&self) -> &Transaction {
        &self.tx
    }

    /// Commit on success, roll back on failure. Locks are released on return.
    pub(crate) async fn finish<T>(self, result: Result<T, DatabaseError>) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                self.tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::debug!(error = %err, "unit of work rolled back");
                Err(err)
            }
        }
    }
}

/// What a status-changing write records in the audit log.
pub(crate) struct Change<'a> {
    pub actor_id: &'a str,
    pub action: AuditAction,
    pub comment: Option<&'a str>,
    pub detail: Option<serde_json::Value>,
}

impl<'a> Change<'a> {
    pub(crate) const fn new(actor_id: &'a str, action: AuditAction) -> Self {
        Self {
            actor_id,
            action,
            comment: None,
            detail: None,
        }
    }

    pub(crate) const fn comment(mut self, comment: Option<&'a str>) -> Self {
        self.comment = comment;
        self
    }

    pub(crate) fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl LifecycleService {
    /// Create a service over an open database with permissive collaborators.
    #[must_use]
    pub fn from_db(db: CovDb, policy: ApprovalPolicy) -> Self {
        Self {
            db,
            permissions: Arc::new(AllowAll),
            dispatcher: Arc::new(NoopDispatcher),
            policy,
            locks: ContractLocks::new(),
            gate: Mutex::new(()),
        }
    }

    /// Open a local database and build the service with default collaborators.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, policy: ApprovalPolicy) -> Result<Self, DatabaseError> {
        let db = CovDb::open_local(db_path).await?;
        Ok(Self::from_db(db, policy))
    }

    /// Build the service from loaded configuration.
    ///
    /// Grants from `[permissions]` become the permission checker; with no
    /// grants configured every action is allowed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the grants are invalid or the database
    /// cannot be opened.
    pub async fn from_config(config: &CovenantConfig) -> Result<Self, DatabaseError> {
        let db = CovDb::open_local(&config.database.path).await?;
        let service = Self::from_db(db, config.approvals.to_policy());
        if config.permissions.is_empty() {
            return Ok(service);
        }
        let grants = config
            .permissions
            .grant_table()
            .map_err(|e| DatabaseError::InvalidState(e.to_string()))?;
        Ok(service.with_permissions(Arc::new(grants)))
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionChecker>) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &CovDb {
        &self.db
    }

    #[must_use]
    pub const fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    pub(crate) fn permissions(&self) -> &dyn PermissionChecker {
        self.permissions.as_ref()
    }

    /// Open a unit of work, serialized per contract when `contract_id` is given.
    pub(crate) async fn begin(&self, contract_id: Option<&str>) -> Result<Unit<'_>, DatabaseError> {
        let contract = match contract_id {
            Some(id) => Some(self.lock_contract(id).await),
            None => None,
        };
        self.open(contract).await
    }

    /// Take a contract's lock ahead of its unit of work.
    ///
    /// Work done between this and [`Self::begin_locked`] does not hold the
    /// connection gate, so other contracts proceed meanwhile.
    pub(crate) async fn lock_contract(&self, contract_id: &str) -> ContractGuard {
        self.locks.acquire(contract_id).await
    }

    /// Open a unit of work under a contract lock the caller already holds.
    pub(crate) async fn begin_locked(
        &self,
        contract: ContractGuard,
    ) -> Result<Unit<'_>, DatabaseError> {
        self.open(Some(contract)).await
    }

    async fn open(&self, contract: Option<ContractGuard>) -> Result<Unit<'_>, DatabaseError> {
        let gate = self.gate.lock().await;
        let tx = self
            .db
            .conn()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;
        Ok(Unit {
            tx,
            _gate: gate,
            _contract: contract,
        })
    }

    /// Hold the connection gate for a read outside any unit of work.
    pub(crate) async fn read_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Fail with `Unauthorized` unless the checker grants `action`.
    pub(crate) fn authorize(
        &self,
        actor_id: &str,
        action: Action,
        contract: &Contract,
    ) -> Result<(), DatabaseError> {
        if self.permissions.can(actor_id, action, contract) {
            Ok(())
        } else {
            tracing::debug!(actor_id, %action, contract_id = %contract.id, "permission denied");
            Err(CoreError::Unauthorized {
                actor_id: actor_id.to_string(),
                action,
            }
            .into())
        }
    }

    /// Persist `after` over `before` and append the matching audit entry.
    ///
    /// The contract row is compare-and-swapped on `before.row_version`.
    pub(crate) async fn record(
        &self,
        conn: &libsql::Connection,
        before: &Contract,
        after: Contract,
        change: Change<'_>,
    ) -> Result<(Contract, LifecycleNotification), DatabaseError> {
        let saved = update_contract(conn, &after, before.row_version).await?;
        let entry = self
            .append(conn, &saved, Some(before.status), change, saved.updated_at)
            .await?;
        Ok((saved, notification(&entry)))
    }

    /// Run one state-machine `event` on a contract as a full unit of work.
    ///
    /// Used by operations whose only effect is the status change itself.
    pub(crate) async fn apply_event(
        &self,
        contract_id: &str,
        event: LifecycleEvent,
        action: Action,
        change: Change<'_>,
    ) -> Result<Contract, DatabaseError> {
        let unit = self.begin(Some(contract_id)).await?;
        let result = async {
            let conn = unit.tx();
            let contract = fetch_contract(conn, contract_id).await?;
            ensure_not_terminal(&contract, event)?;
            let after = transition(&contract, event, Utc::now())?;
            self.authorize(change.actor_id, action, &contract)?;
            self.record(conn, &contract, after, change).await
        }
        .await;

        let (contract, notification) = unit.finish(result).await?;
        self.dispatch(&notification);
        Ok(contract)
    }

    /// Append an audit entry for `contract` inside the caller's transaction.
    pub(crate) async fn append(
        &self,
        conn: &libsql::Connection,
        contract: &Contract,
        from_status: Option<ContractStatus>,
        change: Change<'_>,
        at: DateTime<Utc>,
    ) -> Result<AuditLogEntry, DatabaseError> {
        let entry = AuditLogEntry {
            id: generate_id(conn, PREFIX_AUDIT).await?,
            contract_id: contract.id.clone(),
            actor_id: change.actor_id.to_string(),
            action: change.action,
            from_status,
            to_status: contract.status,
            comment: change.comment.map(String::from),
            detail: change.detail,
            created_at: at,
        };
        insert_audit(conn, &entry).await?;
        Ok(entry)
    }

    /// Hand a committed event to the dispatcher. Never fails the operation.
    pub(crate) fn dispatch(&self, notification: &LifecycleNotification) {
        tracing::info!(
            contract_id = %notification.contract_id,
            action = %notification.action,
            to_status = %notification.to_status,
            "lifecycle event committed"
        );
        self.dispatcher.notify(notification);
    }
}

/// Build the post-commit notification for an audit entry.
pub(crate) fn notification(entry: &AuditLogEntry) -> LifecycleNotification {
    LifecycleNotification {
        contract_id: entry.contract_id.clone(),
        actor_id: entry.actor_id.clone(),
        action: entry.action,
        from_status: entry.from_status,
        to_status: entry.to_status,
        comment: entry.comment.clone(),
    }
}
