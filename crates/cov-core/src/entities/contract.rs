use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ContractStatus;
use crate::errors::CoreError;

/// The external party a contract is negotiated with.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Counterparty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

/// A negotiated legal document moving through the lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Contract {
    pub id: String,
    pub title: String,
    pub status: ContractStatus,
    pub counterparty: Counterparty,
    /// Monetary value in minor currency units, when known.
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    /// Finance review explicitly requested regardless of amount.
    pub finance_review_requested: bool,
    /// Head-level legal sign-off explicitly required.
    pub head_signoff_required: bool,
    /// Incremented on every submit/resubmit; approvals belong to a round.
    pub review_round: u32,
    pub latest_version: u32,
    /// Compare-and-swap token, bumped on every write to the contract row.
    pub row_version: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a contract.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct NewContract {
    pub title: String,
    pub counterparty: Counterparty,
    #[serde(default)]
    pub amount_minor: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub finance_review_requested: bool,
    #[serde(default)]
    pub head_signoff_required: bool,
}

impl NewContract {
    /// Minimal input: a title and a counterparty name.
    #[must_use]
    pub fn new(title: impl Into<String>, counterparty: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            counterparty: Counterparty {
                name: counterparty.into(),
                email: None,
                organization: None,
            },
            amount_minor: None,
            currency: None,
            finance_review_requested: false,
            head_signoff_required: false,
        }
    }

    #[must_use]
    pub fn with_amount(mut self, amount_minor: i64, currency: impl Into<String>) -> Self {
        self.amount_minor = Some(amount_minor);
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub const fn with_finance_review(mut self) -> Self {
        self.finance_review_requested = true;
        self
    }

    #[must_use]
    pub const fn with_head_signoff(mut self) -> Self {
        self.head_signoff_required = true;
        self
    }

    /// Boundary validation before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty title or counterparty name,
    /// a negative amount, or a currency that is not a three-letter code.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation("contract title must not be empty".into()));
        }
        if self.counterparty.name.trim().is_empty() {
            return Err(CoreError::Validation(
                "counterparty name must not be empty".into(),
            ));
        }
        if self.amount_minor.is_some_and(|amount| amount < 0) {
            return Err(CoreError::Validation("amount must not be negative".into()));
        }
        if let Some(currency) = &self.currency {
            if !(currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase())) {
                return Err(CoreError::Validation(format!(
                    "currency '{currency}' is not a three-letter ISO code"
                )));
            }
        }
        Ok(())
    }
}
