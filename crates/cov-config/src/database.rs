//! Local libSQL database configuration.

use serde::{Deserialize, Serialize};

/// Path used for an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

fn default_path() -> String {
    ".covenant/covenant.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database file path, relative to the working directory, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY
    }
}
