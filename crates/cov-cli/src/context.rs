use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cov_config::CovenantConfig;
use cov_core::collaborators::TracingDispatcher;
use cov_db::service::LifecycleService;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: LifecycleService,
    pub config: CovenantConfig,
}

impl AppContext {
    /// Load configuration, apply flag overrides, and open the database.
    pub async fn init(flags: &GlobalFlags) -> anyhow::Result<Self> {
        let mut config =
            CovenantConfig::load_with_dotenv().context("failed to load covenant configuration")?;
        if let Some(path) = &flags.database {
            config.database.path.clone_from(path);
        }

        if !config.database.is_in_memory() {
            ensure_parent_dir(Path::new(&config.database.path))?;
        }
        tracing::debug!(path = %config.database.path, "opening contract database");

        let service = LifecycleService::from_config(&config)
            .await
            .context("failed to initialize lifecycle service")?
            .with_dispatcher(Arc::new(TracingDispatcher));

        Ok(Self { service, config })
    }

    /// The global `--limit` flag, falling back to `general.default_limit`.
    #[must_use]
    pub fn limit(&self, flags: &GlobalFlags) -> u32 {
        flags.limit.unwrap_or(self.config.general.default_limit)
    }
}

fn ensure_parent_dir(db_path: &Path) -> anyhow::Result<()> {
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display())),
        _ => Ok(()),
    }
}
