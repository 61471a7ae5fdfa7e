//! Database error types for cov-db.

use cov_core::errors::CoreError;
use thiserror::Error;

/// Errors from database operations and the lifecycle service.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned malformed data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A lifecycle rule rejected the operation.
    #[error(transparent)]
    Lifecycle(#[from] CoreError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// The domain error, if this failure was a lifecycle rule rather than storage.
    #[must_use]
    pub const fn domain(&self) -> Option<&CoreError> {
        match self {
            Self::Lifecycle(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the caller may retry the operation once.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Lifecycle(err) if err.is_retryable())
    }
}

/// Map a write failure on a uniquely-indexed table to `ConcurrentModification`.
///
/// Unique indexes back the per-contract serialization; tripping one means
/// another writer got there first.
pub(crate) fn on_conflict(err: libsql::Error, contract_id: &str) -> DatabaseError {
    if err.to_string().contains("UNIQUE constraint failed") {
        CoreError::ConcurrentModification {
            contract_id: contract_id.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_exposes_core_error() {
        let err: DatabaseError = CoreError::Validation("reason too short".into()).into();
        assert!(matches!(err.domain(), Some(CoreError::Validation(_))));
        assert_eq!(err.to_string(), "Validation error: reason too short");
        assert!(DatabaseError::NoResult.domain().is_none());
    }

    #[test]
    fn retryable_only_for_concurrent_modification() {
        let err: DatabaseError = CoreError::ConcurrentModification {
            contract_id: "ctr-1".into(),
        }
        .into();
        assert!(err.is_retryable());
        assert!(!DatabaseError::Query("boom".into()).is_retryable());
    }
}
