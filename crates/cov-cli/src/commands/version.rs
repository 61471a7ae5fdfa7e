use std::io::Write;

use chrono::{DateTime, Utc};
use cov_core::changelog::ChangeLog;
use cov_core::entities::ContractVersion;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::VersionCommands;
use crate::commands::shared::content::read_content;
use crate::context::AppContext;
use crate::output::output;

/// Version metadata without the snapshot bytes.
#[derive(Debug, Serialize)]
struct VersionSummary {
    id: String,
    contract_id: String,
    version_number: u32,
    size_bytes: usize,
    restored_from: Option<u32>,
    change_log: Option<ChangeLog>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<ContractVersion> for VersionSummary {
    fn from(version: ContractVersion) -> Self {
        Self {
            size_bytes: version.content_snapshot.len(),
            id: version.id,
            contract_id: version.contract_id,
            version_number: version.version_number,
            restored_from: version.restored_from,
            change_log: version.change_log,
            created_by: version.created_by,
            created_at: version.created_at,
        }
    }
}

/// Handle `cov version`.
pub async fn handle(
    action: &VersionCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        VersionCommands::Create {
            contract_id,
            source,
        } => {
            let Some(content) = read_content(source)? else {
                anyhow::bail!("version create needs --content or --file");
            };
            let version = svc.create_version(contract_id, flags.actor()?, content).await?;
            output(&VersionSummary::from(version), flags.format)
        }
        VersionCommands::Restore {
            contract_id,
            version_id,
        } => {
            let version = svc
                .restore_version(contract_id, version_id, flags.actor()?)
                .await?;
            output(&VersionSummary::from(version), flags.format)
        }
        VersionCommands::Get { id, content } => {
            let version = svc.get_version(id).await?;
            if *content {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&version.content_snapshot)?;
                stdout.flush()?;
                return Ok(());
            }
            output(&VersionSummary::from(version), flags.format)
        }
        VersionCommands::Latest { contract_id } => {
            let version = svc.latest_version(contract_id).await?;
            output(&VersionSummary::from(version), flags.format)
        }
        VersionCommands::List { contract_id } => {
            let versions = svc
                .list_versions(contract_id)
                .await?
                .into_iter()
                .map(VersionSummary::from)
                .collect::<Vec<_>>();
            output(&versions, flags.format)
        }
    }
}
