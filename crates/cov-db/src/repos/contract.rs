//! Contract repository: creation, compare-and-swap updates, and reads.

use chrono::Utc;

use cov_core::entities::{Contract, Counterparty, NewContract};
use cov_core::enums::{Action, AuditAction, ContractStatus};
use cov_core::errors::CoreError;
use cov_core::ids::PREFIX_CONTRACT;

use crate::error::DatabaseError;
use crate::generate_id;
use crate::helpers::{get_bool, get_opt_string, get_u32, get_u64, parse_datetime, parse_enum, sql_u64};
use crate::repos::version::{NewVersion, insert_version};
use crate::service::{Change, LifecycleService, notification};

pub(crate) const SELECT_COLS: &str = "id, title, status, counterparty_name, counterparty_email, \
     counterparty_organization, amount_minor, currency, finance_review_requested, \
     head_signoff_required, review_round, latest_version, row_version, created_by, \
     created_at, updated_at";

/// Filter criteria for contract listings.
#[derive(Debug, Default, Clone)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub limit: Option<u32>,
}

fn row_to_contract(row: &libsql::Row) -> Result<Contract, DatabaseError> {
    Ok(Contract {
        id: row.get::<String>(0)?,
        title: row.get::<String>(1)?,
        status: parse_enum(&row.get::<String>(2)?)?,
        counterparty: Counterparty {
            name: row.get::<String>(3)?,
            email: get_opt_string(row, 4)?,
            organization: get_opt_string(row, 5)?,
        },
        amount_minor: row.get::<Option<i64>>(6)?,
        currency: get_opt_string(row, 7)?,
        finance_review_requested: get_bool(row, 8)?,
        head_signoff_required: get_bool(row, 9)?,
        review_round: get_u32(row, 10)?,
        latest_version: get_u32(row, 11)?,
        row_version: get_u64(row, 12)?,
        created_by: row.get::<String>(13)?,
        created_at: parse_datetime(&row.get::<String>(14)?)?,
        updated_at: parse_datetime(&row.get::<String>(15)?)?,
    })
}

pub(crate) async fn insert_contract(
    conn: &libsql::Connection,
    contract: &Contract,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO contracts ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"),
        libsql::params![
            contract.id.as_str(),
            contract.title.as_str(),
            contract.status.as_str(),
            contract.counterparty.name.as_str(),
            contract.counterparty.email.as_deref(),
            contract.counterparty.organization.as_deref(),
            contract.amount_minor,
            contract.currency.as_deref(),
            i64::from(contract.finance_review_requested),
            i64::from(contract.head_signoff_required),
            i64::from(contract.review_round),
            i64::from(contract.latest_version),
            sql_u64(contract.row_version)?,
            contract.created_by.as_str(),
            contract.created_at.to_rfc3339(),
            contract.updated_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(())
}

/// Read one contract on `conn`.
///
/// # Errors
///
/// Returns `CoreError::NotFound` if no contract has this id.
pub(crate) async fn fetch_contract(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Contract, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM contracts WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => row_to_contract(&row),
        None => Err(CoreError::not_found("contract", id).into()),
    }
}

/// Write every mutable column of `contract` if the stored row still carries
/// `expected_row_version`, and return the contract with its bumped token.
///
/// # Errors
///
/// Returns `CoreError::ConcurrentModification` if another writer moved the
/// row in the meantime.
pub(crate) async fn update_contract(
    conn: &libsql::Connection,
    contract: &Contract,
    expected_row_version: u64,
) -> Result<Contract, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE contracts SET title = ?1, status = ?2, review_round = ?3, latest_version = ?4,
                row_version = row_version + 1, updated_at = ?5
             WHERE id = ?6 AND row_version = ?7",
            libsql::params![
                contract.title.as_str(),
                contract.status.as_str(),
                i64::from(contract.review_round),
                i64::from(contract.latest_version),
                contract.updated_at.to_rfc3339(),
                contract.id.as_str(),
                sql_u64(expected_row_version)?
            ],
        )
        .await?;
    if changed == 0 {
        return Err(CoreError::ConcurrentModification {
            contract_id: contract.id.clone(),
        }
        .into());
    }
    Ok(Contract {
        row_version: expected_row_version + 1,
        ..contract.clone()
    })
}

impl LifecycleService {
    /// Create a contract in `draft` with `content` as version 1.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for malformed input,
    /// `CoreError::Unauthorized` if the actor may not edit content, or a
    /// storage error.
    pub async fn create_contract(
        &self,
        actor_id: &str,
        input: &NewContract,
        content: Vec<u8>,
    ) -> Result<Contract, DatabaseError> {
        input.validate()?;

        let unit = self.begin(None).await?;
        let result = async {
            let conn = unit.tx();
            let now = Utc::now();
            let contract = Contract {
                id: generate_id(conn, PREFIX_CONTRACT).await?,
                title: input.title.trim().to_string(),
                status: ContractStatus::Draft,
                counterparty: input.counterparty.clone(),
                amount_minor: input.amount_minor,
                currency: input.currency.clone(),
                finance_review_requested: input.finance_review_requested,
                head_signoff_required: input.head_signoff_required,
                review_round: 0,
                latest_version: 1,
                row_version: 0,
                created_by: actor_id.to_string(),
                created_at: now,
                updated_at: now,
            };
            self.authorize(actor_id, Action::EditContent, &contract)?;

            insert_contract(conn, &contract).await?;
            insert_version(
                conn,
                NewVersion {
                    contract_id: &contract.id,
                    version_number: 1,
                    content_snapshot: content,
                    change_log: None,
                    restored_from: None,
                    created_by: actor_id,
                    created_at: now,
                },
            )
            .await?;
            let entry = self
                .append(
                    conn,
                    &contract,
                    None,
                    Change::new(actor_id, AuditAction::Created),
                    now,
                )
                .await?;
            Ok::<_, DatabaseError>((contract, notification(&entry)))
        }
        .await;

        let (contract, event) = unit.finish(result).await?;
        self.dispatch(&event);
        Ok(contract)
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the contract does not exist.
    pub async fn get_contract(&self, id: &str) -> Result<Contract, DatabaseError> {
        let _gate = self.read_gate().await;
        fetch_contract(self.db().conn(), id).await
    }

    /// List contracts, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_contracts(
        &self,
        filter: &ContractFilter,
    ) -> Result<Vec<Contract>, DatabaseError> {
        let limit = filter.limit.unwrap_or(100);
        let mut params: Vec<libsql::Value> = Vec::new();
        let where_clause = match filter.status {
            Some(status) => {
                params.push(libsql::Value::Text(status.as_str().to_string()));
                "WHERE status = ?1"
            }
            None => "",
        };
        let sql = format!(
            "SELECT {SELECT_COLS} FROM contracts {where_clause}
             ORDER BY updated_at DESC, id LIMIT {limit}"
        );

        let _gate = self.read_gate().await;
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut contracts = Vec::new();
        while let Some(row) = rows.next().await? {
            contracts.push(row_to_contract(&row)?);
        }
        Ok(contracts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{sample_contract, test_service};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn create_contract_starts_in_draft_with_version_one() {
        let svc = test_service().await;
        let contract = svc
            .create_contract("usr-alice", &sample_contract(), b"Clause one.".to_vec())
            .await
            .unwrap();

        assert_eq!(contract.status, ContractStatus::Draft);
        assert_eq!(contract.latest_version, 1);
        assert_eq!(contract.review_round, 0);
        assert!(cov_core::ids::has_prefix(&contract.id, PREFIX_CONTRACT));

        let stored = svc.get_contract(&contract.id).await.unwrap();
        assert_eq!(stored, contract);

        let history = svc.contract_history(&contract.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, AuditAction::Created);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].to_status, ContractStatus::Draft);
    }

    #[tokio::test]
    async fn create_contract_validates_input() {
        let svc = test_service().await;
        let err = svc
            .create_contract("usr-alice", &NewContract::new("", "Acme"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::Validation(_))));
        assert!(svc.list_contracts(&ContractFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_missing_contract_is_not_found() {
        let svc = test_service().await;
        let err = svc.get_contract("ctr-deadbeef").await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn cas_update_rejects_stale_row_version() {
        let svc = test_service().await;
        let contract = svc
            .create_contract("usr-alice", &sample_contract(), Vec::new())
            .await
            .unwrap();
        let conn = svc.db().conn();

        let renamed = Contract {
            title: "Renamed".into(),
            ..contract.clone()
        };
        let saved = update_contract(conn, &renamed, contract.row_version).await.unwrap();
        assert_eq!(saved.row_version, contract.row_version + 1);

        let err = update_contract(conn, &renamed, contract.row_version)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn list_contracts_filters_by_status() {
        let svc = test_service().await;
        let a = svc
            .create_contract("usr-alice", &sample_contract(), Vec::new())
            .await
            .unwrap();
        let b = svc
            .create_contract("usr-alice", &sample_contract(), Vec::new())
            .await
            .unwrap();
        svc.submit(&b.id, "usr-alice").await.unwrap();

        let drafts = svc
            .list_contracts(&ContractFilter {
                status: Some(ContractStatus::Draft),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, a.id);

        let limited = svc
            .list_contracts(&ContractFilter {
                status: None,
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }
}
