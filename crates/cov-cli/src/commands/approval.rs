use crate::cli::GlobalFlags;
use crate::cli::subcommands::ApprovalCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `cov approval`.
pub async fn handle(
    action: &ApprovalCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        ApprovalCommands::List { contract_id } => {
            output(&svc.list_approvals(contract_id).await?, flags.format)
        }
        ApprovalCommands::Get { id } => output(&svc.get_approval(id).await?, flags.format),
        ApprovalCommands::Approve { id, comment } => {
            let contract = svc.approve(id, flags.actor()?, comment.as_deref()).await?;
            output(&contract, flags.format)
        }
        ApprovalCommands::Reject { id, comment } => {
            output(&svc.reject(id, flags.actor()?, comment).await?, flags.format)
        }
        ApprovalCommands::RequestRevision { id, comment } => {
            let contract = svc.request_revision(id, flags.actor()?, comment).await?;
            output(&contract, flags.format)
        }
        ApprovalCommands::ReturnToManager { id, comment } => {
            let contract = svc.return_to_manager(id, flags.actor()?, comment).await?;
            output(&contract, flags.format)
        }
    }
}
