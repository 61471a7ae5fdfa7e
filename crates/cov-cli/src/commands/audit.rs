use cov_core::enums::AuditAction;
use cov_db::repos::audit::AuditFilter;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::AuditArgs;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `cov audit`.
pub async fn handle(args: &AuditArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let action = args
        .action
        .as_deref()
        .map(|raw| parse_enum::<AuditAction>(raw, "action"))
        .transpose()?;
    let filter = AuditFilter {
        contract_id: args.contract.clone(),
        actor_id: args.actor_id.clone(),
        action,
        limit: Some(ctx.limit(flags)),
    };
    output(&ctx.service.query_audit(&filter).await?, flags.format)
}
