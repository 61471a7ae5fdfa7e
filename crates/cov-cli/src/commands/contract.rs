use anyhow::Context;
use cov_core::actions::AvailableAction;
use cov_core::entities::{Counterparty, NewContract};
use cov_core::enums::ContractStatus;
use cov_db::repos::contract::ContractFilter;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ContractCommands;
use crate::commands::shared::content::read_content;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ActionsResponse<'a> {
    contract_id: &'a str,
    actor_id: &'a str,
    actions: Vec<AvailableAction>,
}

/// Handle `cov contract`.
pub async fn handle(
    action: &ContractCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        ContractCommands::Create {
            title,
            counterparty,
            counterparty_email,
            counterparty_org,
            amount_minor,
            currency,
            finance_review,
            head_signoff,
            source,
        } => {
            let input = NewContract {
                title: title.clone(),
                counterparty: Counterparty {
                    name: counterparty.clone(),
                    email: counterparty_email.clone(),
                    organization: counterparty_org.clone(),
                },
                amount_minor: *amount_minor,
                currency: currency.clone(),
                finance_review_requested: *finance_review,
                head_signoff_required: *head_signoff,
            };
            let content = read_content(source)?.unwrap_or_default();
            let contract = svc.create_contract(flags.actor()?, &input, content).await?;
            output(&contract, flags.format)
        }
        ContractCommands::Get { id } => output(&svc.get_contract(id).await?, flags.format),
        ContractCommands::List { status } => {
            let status = status
                .as_deref()
                .map(|raw| parse_enum::<ContractStatus>(raw, "status"))
                .transpose()?;
            let filter = ContractFilter {
                status,
                limit: Some(ctx.limit(flags)),
            };
            output(&svc.list_contracts(&filter).await?, flags.format)
        }
        ContractCommands::Submit { id } => {
            output(&svc.submit(id, flags.actor()?).await?, flags.format)
        }
        ContractCommands::Resubmit { id } => {
            output(&svc.resubmit(id, flags.actor()?).await?, flags.format)
        }
        ContractCommands::Revise { id } => {
            output(&svc.revise_draft(id, flags.actor()?).await?, flags.format)
        }
        ContractCommands::Escalate { id, reason } => {
            output(&svc.escalate(id, flags.actor()?, reason).await?, flags.format)
        }
        ContractCommands::Cancel { id, reason } => {
            output(&svc.cancel(id, flags.actor()?, reason).await?, flags.format)
        }
        ContractCommands::Send { id, to } => {
            let contract = svc.send_to_counterparty(id, flags.actor()?, to).await?;
            output(&contract, flags.format)
        }
        ContractCommands::Countersign { id, comment } => {
            let contract = svc
                .record_countersignature(id, flags.actor()?, comment.as_deref())
                .await?;
            output(&contract, flags.format)
        }
        ContractCommands::Activate { id, comment } => {
            let contract = svc.activate(id, flags.actor()?, comment.as_deref()).await?;
            output(&contract, flags.format)
        }
        ContractCommands::Expire { id, comment } => {
            let contract = svc.expire(id, flags.actor()?, comment.as_deref()).await?;
            output(&contract, flags.format)
        }
        ContractCommands::Terminate { id, reason } => {
            output(&svc.terminate(id, flags.actor()?, reason).await?, flags.format)
        }
        ContractCommands::Actions { id } => {
            let actor_id = flags.actor()?;
            let actions = svc
                .available_actions(id, actor_id)
                .await
                .with_context(|| format!("failed to compute actions for {id}"))?;
            output(
                &ActionsResponse {
                    contract_id: id,
                    actor_id,
                    actions: actions.into_iter().collect(),
                },
                flags.format,
            )
        }
        ContractCommands::History { id } => {
            output(&svc.contract_history(id).await?, flags.format)
        }
    }
}
