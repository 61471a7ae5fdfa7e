//! Version ledger: immutable, contiguously numbered content snapshots.
//!
//! Numbers are allocated as `max + 1` inside the caller's transaction while
//! the contract's lock is held; `UNIQUE(contract_id, version_number)` turns
//! any writer that slips past the lock into a `ConcurrentModification`.
//!
//! The changelog is computed on the blocking pool after the contract lock is
//! taken but before the connection gate is, so a large diff only delays
//! operations on its own contract.

use chrono::{DateTime, Utc};
use serde_json::json;

use cov_core::changelog::{ChangeLog, diff_snapshots};
use cov_core::entities::{Contract, ContractVersion};
use cov_core::enums::{Action, AuditAction};
use cov_core::errors::CoreError;
use cov_core::ids::PREFIX_VERSION;

use crate::error::{DatabaseError, on_conflict};
use crate::generate_id;
use crate::helpers::{get_opt_string, get_u32, parse_datetime, parse_optional_json, to_json_text};
use crate::repos::contract::fetch_contract;
use crate::service::{Change, LifecycleService};

const SELECT_COLS: &str = "id, contract_id, version_number, content_snapshot, change_log, \
     restored_from, created_by, created_at";

fn row_to_version(row: &libsql::Row) -> Result<ContractVersion, DatabaseError> {
    let restored_from = row
        .get::<Option<i64>>(5)?
        .map(u32::try_from)
        .transpose()
        .map_err(|e| DatabaseError::Query(format!("restored_from out of range: {e}")))?;
    Ok(ContractVersion {
        id: row.get::<String>(0)?,
        contract_id: row.get::<String>(1)?,
        version_number: get_u32(row, 2)?,
        content_snapshot: row.get::<Vec<u8>>(3)?,
        change_log: parse_optional_json(get_opt_string(row, 4)?.as_deref())?,
        restored_from,
        created_by: row.get::<String>(6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

/// Fields of a version about to be appended.
pub(crate) struct NewVersion<'a> {
    pub contract_id: &'a str,
    pub version_number: u32,
    pub content_snapshot: Vec<u8>,
    pub change_log: Option<ChangeLog>,
    pub restored_from: Option<u32>,
    pub created_by: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Insert one version row.
///
/// # Errors
///
/// Returns `CoreError::ConcurrentModification` if the number is already taken.
pub(crate) async fn insert_version(
    conn: &libsql::Connection,
    new: NewVersion<'_>,
) -> Result<ContractVersion, DatabaseError> {
    let id = generate_id(conn, PREFIX_VERSION).await?;
    let change_log = new.change_log.as_ref().map(to_json_text).transpose()?;
    conn.execute(
        &format!("INSERT INTO contract_versions ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        libsql::params![
            id.as_str(),
            new.contract_id,
            i64::from(new.version_number),
            new.content_snapshot.clone(),
            change_log,
            new.restored_from.map(i64::from),
            new.created_by,
            new.created_at.to_rfc3339()
        ],
    )
    .await
    .map_err(|e| on_conflict(e, new.contract_id))?;

    Ok(ContractVersion {
        id,
        contract_id: new.contract_id.to_string(),
        version_number: new.version_number,
        content_snapshot: new.content_snapshot,
        change_log: new.change_log,
        restored_from: new.restored_from,
        created_by: new.created_by.to_string(),
        created_at: new.created_at,
    })
}

/// # Errors
///
/// Returns `CoreError::NotFound` if no version has this id.
pub(crate) async fn fetch_version(
    conn: &libsql::Connection,
    id: &str,
) -> Result<ContractVersion, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM contract_versions WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => row_to_version(&row),
        None => Err(CoreError::not_found("version", id).into()),
    }
}

/// The highest-numbered version of a contract.
///
/// # Errors
///
/// Returns `CoreError::NotFound` if the contract has no versions.
pub(crate) async fn fetch_latest_version(
    conn: &libsql::Connection,
    contract_id: &str,
) -> Result<ContractVersion, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM contract_versions WHERE contract_id = ?1
                 ORDER BY version_number DESC LIMIT 1"
            ),
            [contract_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => row_to_version(&row),
        None => Err(CoreError::not_found("version of contract", contract_id).into()),
    }
}

fn ensure_editable(contract: &Contract) -> Result<(), DatabaseError> {
    if contract.status.is_terminal() {
        return Err(CoreError::ContractTerminal {
            contract_id: contract.id.clone(),
            status: contract.status,
        }
        .into());
    }
    Ok(())
}

/// Diff `old` against `new` on the blocking pool, handing `new` back.
async fn diff_off_thread(
    old: Vec<u8>,
    new: Vec<u8>,
) -> Result<(Vec<u8>, ChangeLog), DatabaseError> {
    tokio::task::spawn_blocking(move || {
        let log = diff_snapshots(&old, &new);
        (new, log)
    })
    .await
    .map_err(|e| DatabaseError::Other(anyhow::anyhow!("changelog task failed: {e}")))
}

impl LifecycleService {
    /// Append a new version holding `content`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ContractTerminal` for a terminal contract,
    /// `CoreError::Unauthorized` without `edit_content`, or
    /// `CoreError::ConcurrentModification` if the number was taken.
    pub async fn create_version(
        &self,
        contract_id: &str,
        actor_id: &str,
        content: Vec<u8>,
    ) -> Result<ContractVersion, DatabaseError> {
        self.append_version(contract_id, actor_id, content, None).await
    }

    /// Append a new version whose snapshot is a byte-for-byte copy of
    /// `target_version_id`. Earlier versions are untouched.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the target does not exist or belongs
    /// to another contract, plus everything [`Self::create_version`] returns.
    pub async fn restore_version(
        &self,
        contract_id: &str,
        target_version_id: &str,
        actor_id: &str,
    ) -> Result<ContractVersion, DatabaseError> {
        let target = self.get_version(target_version_id).await?;
        if target.contract_id != contract_id {
            return Err(CoreError::not_found("version", target_version_id).into());
        }
        self.append_version(
            contract_id,
            actor_id,
            target.content_snapshot,
            Some(target.version_number),
        )
        .await
    }

    async fn append_version(
        &self,
        contract_id: &str,
        actor_id: &str,
        content: Vec<u8>,
        restored_from: Option<u32>,
    ) -> Result<ContractVersion, DatabaseError> {
        let lock = self.lock_contract(contract_id).await;
        let base = {
            let _gate = self.read_gate().await;
            let conn = self.db().conn();
            let contract = fetch_contract(conn, contract_id).await?;
            ensure_editable(&contract)?;
            self.authorize(actor_id, Action::EditContent, &contract)?;
            fetch_latest_version(conn, contract_id).await?
        };
        let base_number = base.version_number;
        let (content, change_log) = diff_off_thread(base.content_snapshot, content).await?;

        let unit = self.begin_locked(lock).await?;
        let result = async {
            let conn = unit.tx();
            let contract = fetch_contract(conn, contract_id).await?;
            ensure_editable(&contract)?;
            self.authorize(actor_id, Action::EditContent, &contract)?;

            // Another process may have appended while the diff ran.
            let latest = fetch_latest_version(conn, contract_id).await?;
            if latest.version_number != base_number {
                return Err(CoreError::ConcurrentModification {
                    contract_id: contract_id.to_string(),
                }
                .into());
            }
            let now = Utc::now();
            let version = insert_version(
                conn,
                NewVersion {
                    contract_id,
                    version_number: latest.version_number + 1,
                    change_log: Some(change_log),
                    content_snapshot: content,
                    restored_from,
                    created_by: actor_id,
                    created_at: now,
                },
            )
            .await?;

            let (action, detail) = match restored_from {
                Some(from) => (
                    AuditAction::VersionRestored,
                    json!({"version_number": version.version_number, "restored_from": from}),
                ),
                None => (
                    AuditAction::VersionCreated,
                    json!({"version_number": version.version_number}),
                ),
            };
            let after = Contract {
                latest_version: version.version_number,
                updated_at: now,
                ..contract.clone()
            };
            let (_, event) = self
                .record(conn, &contract, after, Change::new(actor_id, action).detail(detail))
                .await?;
            Ok::<_, DatabaseError>((version, event))
        }
        .await;

        let (version, event) = unit.finish(result).await?;
        tracing::debug!(contract_id, version = version.version_number, "version appended");
        self.dispatch(&event);
        Ok(version)
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the version does not exist.
    pub async fn get_version(&self, id: &str) -> Result<ContractVersion, DatabaseError> {
        let _gate = self.read_gate().await;
        fetch_version(self.db().conn(), id).await
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the contract has no versions.
    pub async fn latest_version(&self, contract_id: &str) -> Result<ContractVersion, DatabaseError> {
        let _gate = self.read_gate().await;
        fetch_latest_version(self.db().conn(), contract_id).await
    }

    /// All versions of a contract in ascending number order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_versions(
        &self,
        contract_id: &str,
    ) -> Result<Vec<ContractVersion>, DatabaseError> {
        let _gate = self.read_gate().await;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM contract_versions WHERE contract_id = ?1
                     ORDER BY version_number"
                ),
                [contract_id],
            )
            .await?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next().await? {
            versions.push(row_to_version(&row)?);
        }
        Ok(versions)
    }
}
