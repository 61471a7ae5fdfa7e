//! Approval repository.
//!
//! Approvals are inserted pending and updated at most once more to resolve
//! them (or to move them between review levels and rounds while pending).
//! The `WHERE state = 'pending'` guard on every update makes a second
//! resolution a no-op the caller detects.

use chrono::{DateTime, Utc};

use cov_core::entities::Approval;
use cov_core::enums::{ApprovalState, ReviewLevel, Track};
use cov_core::errors::CoreError;
use cov_core::ids::PREFIX_APPROVAL;

use crate::error::{DatabaseError, on_conflict};
use crate::generate_id;
use crate::helpers::{get_opt_string, get_u32, parse_datetime, parse_enum, parse_optional_datetime};
use crate::service::LifecycleService;

const SELECT_COLS: &str =
    "id, contract_id, track, state, level, round, actor_id, comment, created_at, resolved_at";

fn row_to_approval(row: &libsql::Row) -> Result<Approval, DatabaseError> {
    Ok(Approval {
        id: row.get::<String>(0)?,
        contract_id: row.get::<String>(1)?,
        track: parse_enum(&row.get::<String>(2)?)?,
        state: parse_enum(&row.get::<String>(3)?)?,
        level: parse_enum(&row.get::<String>(4)?)?,
        round: get_u32(row, 5)?,
        actor_id: get_opt_string(row, 6)?,
        comment: get_opt_string(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        resolved_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
    })
}

/// Open a pending approval on `track` for the contract's `round`.
///
/// # Errors
///
/// Returns `CoreError::ConcurrentModification` if the partial unique index
/// finds another pending approval on the track.
pub(crate) async fn open_approval(
    conn: &libsql::Connection,
    contract_id: &str,
    track: Track,
    level: ReviewLevel,
    round: u32,
    now: DateTime<Utc>,
) -> Result<Approval, DatabaseError> {
    let approval = Approval {
        id: generate_id(conn, PREFIX_APPROVAL).await?,
        contract_id: contract_id.to_string(),
        track,
        state: ApprovalState::Pending,
        level,
        round,
        actor_id: None,
        comment: None,
        created_at: now,
        resolved_at: None,
    };
    conn.execute(
        &format!("INSERT INTO approvals ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, ?7, NULL)"),
        libsql::params![
            approval.id.as_str(),
            contract_id,
            track.as_str(),
            approval.state.as_str(),
            level.as_str(),
            i64::from(round),
            now.to_rfc3339()
        ],
    )
    .await
    .map_err(|e| on_conflict(e, contract_id))?;
    Ok(approval)
}

/// # Errors
///
/// Returns `CoreError::NotFound` if no approval has this id.
pub(crate) async fn fetch_approval(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Approval, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM approvals WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => row_to_approval(&row),
        None => Err(CoreError::not_found("approval", id).into()),
    }
}

/// Every approval of a contract, oldest round first.
pub(crate) async fn fetch_approvals(
    conn: &libsql::Connection,
    contract_id: &str,
) -> Result<Vec<Approval>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM approvals WHERE contract_id = ?1
                 ORDER BY round, created_at, rowid"
            ),
            [contract_id],
        )
        .await?;
    let mut approvals = Vec::new();
    while let Some(row) = rows.next().await? {
        approvals.push(row_to_approval(&row)?);
    }
    Ok(approvals)
}

/// Persist a change to a still-pending approval.
///
/// Writes state, level, round and the resolution fields in one statement.
///
/// # Errors
///
/// Returns `CoreError::InvalidApprovalState` if the stored approval is no
/// longer pending.
pub(crate) async fn save_pending_approval(
    conn: &libsql::Connection,
    approval: &Approval,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE approvals SET state = ?1, level = ?2, round = ?3, actor_id = ?4, comment = ?5,
                resolved_at = ?6
             WHERE id = ?7 AND state = 'pending'",
            libsql::params![
                approval.state.as_str(),
                approval.level.as_str(),
                i64::from(approval.round),
                approval.actor_id.as_deref(),
                approval.comment.as_deref(),
                approval.resolved_at.map(|t| t.to_rfc3339()),
                approval.id.as_str()
            ],
        )
        .await?;
    if changed == 0 {
        let stored = fetch_approval(conn, &approval.id).await?;
        return Err(CoreError::InvalidApprovalState {
            approval_id: stored.id,
            state: stored.state,
        }
        .into());
    }
    Ok(())
}

impl LifecycleService {
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the approval does not exist.
    pub async fn get_approval(&self, id: &str) -> Result<Approval, DatabaseError> {
        let _gate = self.read_gate().await;
        fetch_approval(self.db().conn(), id).await
    }

    /// All approvals of a contract across every review round.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_approvals(&self, contract_id: &str) -> Result<Vec<Approval>, DatabaseError> {
        let _gate = self.read_gate().await;
        fetch_approvals(self.db().conn(), contract_id).await
    }
}
