//! Approval routing thresholds.

use cov_core::orchestrator::{
    ApprovalPolicy, DEFAULT_FINANCE_THRESHOLD_MINOR, DEFAULT_MIN_CANCEL_REASON_LEN,
};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_finance_threshold_minor() -> i64 {
    DEFAULT_FINANCE_THRESHOLD_MINOR
}

const fn default_min_cancel_reason_len() -> usize {
    DEFAULT_MIN_CANCEL_REASON_LEN
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApprovalsConfig {
    /// Amount in minor units at or above which finance review is required.
    #[serde(default = "default_finance_threshold_minor")]
    pub finance_threshold_minor: i64,

    /// Amount in minor units at or above which head-level legal sign-off is
    /// mandatory. Unset means only the per-contract flag triggers it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_signoff_threshold_minor: Option<i64>,

    /// Minimum trimmed length of a cancellation reason.
    #[serde(default = "default_min_cancel_reason_len")]
    pub min_cancel_reason_len: usize,
}

impl Default for ApprovalsConfig {
    fn default() -> Self {
        Self {
            finance_threshold_minor: default_finance_threshold_minor(),
            head_signoff_threshold_minor: None,
            min_cancel_reason_len: default_min_cancel_reason_len(),
        }
    }
}

impl ApprovalsConfig {
    /// The policy handed to the lifecycle service.
    #[must_use]
    pub const fn to_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            finance_threshold_minor: self.finance_threshold_minor,
            head_signoff_threshold_minor: self.head_signoff_threshold_minor,
            min_cancel_reason_len: self.min_cancel_reason_len,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.finance_threshold_minor < 0 {
            return Err(ConfigError::invalid(
                "approvals.finance_threshold_minor",
                "must not be negative",
            ));
        }
        if self.head_signoff_threshold_minor.is_some_and(|t| t < 0) {
            return Err(ConfigError::invalid(
                "approvals.head_signoff_threshold_minor",
                "must not be negative",
            ));
        }
        if self.min_cancel_reason_len == 0 {
            return Err(ConfigError::invalid(
                "approvals.min_cancel_reason_len",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_defaults() {
        let config = ApprovalsConfig::default();
        assert_eq!(config.to_policy(), ApprovalPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_threshold_is_invalid() {
        let config = ApprovalsConfig {
            finance_threshold_minor: -1,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("finance_threshold_minor"));

        let config = ApprovalsConfig {
            head_signoff_threshold_minor: Some(-5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cancel_reason_len_is_invalid() {
        let config = ApprovalsConfig {
            min_cancel_reason_len: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
