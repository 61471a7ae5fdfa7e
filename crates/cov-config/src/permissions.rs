//! Static permission grants: actor id to the action names it may perform.
//!
//! ```toml
//! [permissions]
//! "usr-alice" = ["submit", "edit_content", "cancel"]
//! "usr-legal" = ["review_legal", "escalate"]
//! "*" = ["expire"]
//! ```

use std::collections::BTreeMap;

use cov_core::collaborators::GrantTable;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PermissionsConfig {
    pub grants: BTreeMap<String, Vec<String>>,
}

impl PermissionsConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Build the permission checker for these grants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if an action name is unknown.
    pub fn grant_table(&self) -> Result<GrantTable, ConfigError> {
        GrantTable::from_names(&self.grants)
            .map_err(|e| ConfigError::invalid("permissions", e.to_string()))
    }
}
