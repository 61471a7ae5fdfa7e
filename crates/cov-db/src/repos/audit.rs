//! Audit trail repository.
//!
//! Append-only entries recording every lifecycle event. Entries are written
//! inside the transaction of the operation they describe and are never
//! updated or deleted (triggers enforce it). Supports dynamic filtering.

use cov_core::entities::AuditLogEntry;
use cov_core::enums::AuditAction;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::LifecycleService;

const SELECT_COLS: &str =
    "id, contract_id, actor_id, action, from_status, to_status, comment, detail, created_at";

/// Filter criteria for audit queries.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub contract_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

fn row_to_entry(row: &libsql::Row) -> Result<AuditLogEntry, DatabaseError> {
    Ok(AuditLogEntry {
        id: row.get::<String>(0)?,
        contract_id: row.get::<String>(1)?,
        actor_id: row.get::<String>(2)?,
        action: parse_enum(&row.get::<String>(3)?)?,
        from_status: get_opt_string(row, 4)?
            .map(|s| parse_enum(&s))
            .transpose()?,
        to_status: parse_enum(&row.get::<String>(5)?)?,
        comment: get_opt_string(row, 6)?,
        detail: parse_optional_json(get_opt_string(row, 7)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

/// Append an audit entry on `conn`. Called by every mutation.
///
/// # Errors
///
/// Returns `DatabaseError` if the INSERT fails; the caller's transaction
/// then rolls back with it.
pub(crate) async fn insert_audit(
    conn: &libsql::Connection,
    entry: &AuditLogEntry,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO audit_log ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        libsql::params![
            entry.id.as_str(),
            entry.contract_id.as_str(),
            entry.actor_id.as_str(),
            entry.action.as_str(),
            entry.from_status.map(|s| s.as_str()),
            entry.to_status.as_str(),
            entry.comment.as_deref(),
            entry.detail.as_ref().map(std::string::ToString::to_string),
            entry.created_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(())
}

impl LifecycleService {
    /// Query audit entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref cid) = filter.contract_id {
            params.push(libsql::Value::Text(cid.clone()));
            conditions.push(format!("contract_id = ?{}", params.len()));
        }
        if let Some(ref aid) = filter.actor_id {
            params.push(libsql::Value::Text(aid.clone()));
            conditions.push(format!("actor_id = ?{}", params.len()));
        }
        if let Some(action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM audit_log {where_clause}
             ORDER BY rowid DESC LIMIT {limit}"
        );

        let _gate = self.read_gate().await;
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    /// Every audit entry of one contract in the order it was written.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn contract_history(
        &self,
        contract_id: &str,
    ) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let _gate = self.read_gate().await;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM audit_log WHERE contract_id = ?1 ORDER BY rowid"),
                [contract_id],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }
}
