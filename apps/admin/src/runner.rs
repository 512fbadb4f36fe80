use std::collections::BTreeSet;

use keeper_application::{
    CreateRoleInput, MembershipFailure, MembershipPlan, ReconciliationError, ReconciliationStatus,
    RoleAdminService,
};
use keeper_core::AppResult;
use keeper_domain::{Role, UserId};
use tracing::info;

use crate::command::AdminCommand;

/// Lines to print and the status that decides the exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: ReconciliationStatus,
    pub lines: Vec<String>,
}

impl CommandOutput {
    fn succeeded(lines: Vec<String>) -> Self {
        Self {
            status: ReconciliationStatus::Succeeded,
            lines,
        }
    }
}

pub async fn run_command(
    service: &RoleAdminService,
    command: AdminCommand,
) -> AppResult<CommandOutput> {
    match command {
        AdminCommand::Roles => Ok(CommandOutput::succeeded(
            service.list_roles().await?.iter().map(role_line).collect(),
        )),
        AdminCommand::Permissions => Ok(CommandOutput::succeeded(
            service
                .list_permissions()
                .await?
                .iter()
                .map(|permission| {
                    format!(
                        "{}\t{}\t{}",
                        permission.permission_id,
                        permission.key(),
                        permission.description
                    )
                })
                .collect(),
        )),
        AdminCommand::Users => Ok(CommandOutput::succeeded(
            service
                .list_users()
                .await?
                .iter()
                .map(|user| format!("{}\t{}\t{}", user.user_id, user.username, user.label()))
                .collect(),
        )),
        AdminCommand::Members { role } => {
            let role = service.find_role(role.as_str()).await?;
            Ok(CommandOutput::succeeded(
                service
                    .role_members(role.role_id())
                    .await?
                    .iter()
                    .map(|member| format!("{}\t{}", member.user_id, member.label()))
                    .collect(),
            ))
        }
        AdminCommand::Sync {
            role,
            dry_run,
            user_ids,
        } => {
            let role = service.find_role(role.as_str()).await?;
            if dry_run {
                let plan = service.plan_role_members(role.role_id(), user_ids).await?;
                return Ok(CommandOutput::succeeded(plan_lines(&role, &plan)));
            }

            sync_members(service, &role, user_ids.into_iter().collect()).await
        }
        AdminCommand::CreateRole {
            name,
            permission_ids,
        } => {
            let role = service
                .create_role(CreateRoleInput {
                    name,
                    display_name: None,
                    description: None,
                    permission_ids,
                })
                .await?;
            Ok(CommandOutput::succeeded(vec![format!(
                "created {}\t{}",
                role.role_id(),
                role.name()
            )]))
        }
        AdminCommand::DeleteRole { role } => {
            let role = service.find_role(role.as_str()).await?;
            service.delete_role(role.role_id()).await?;
            Ok(CommandOutput::succeeded(vec![format!(
                "deleted {}\t{}",
                role.role_id(),
                role.name()
            )]))
        }
    }
}

async fn sync_members(
    service: &RoleAdminService,
    role: &Role,
    desired: BTreeSet<UserId>,
) -> AppResult<CommandOutput> {
    info!(role_id = %role.role_id(), desired = desired.len(), "syncing role members");

    match service.save_role_members(role.role_id(), desired).await {
        Ok(saved) => {
            let report = &saved.report;
            let mut lines: Vec<String> = report
                .succeeded()
                .iter()
                .map(|operation| format!("ok {operation}"))
                .collect();
            lines.extend(report.failures().iter().map(failure_line));
            lines.push(format!(
                "status: {} ({} succeeded, {} failed)",
                report.status().as_str(),
                report.success_count(),
                report.failure_count()
            ));
            lines.push(match &saved.confirmed_members {
                Some(members) => format!("role {} now has {} members", role.name(), members.len()),
                None => format!("members of role {} could not be confirmed", role.name()),
            });

            Ok(CommandOutput {
                status: report.status(),
                lines,
            })
        }
        Err(ReconciliationError::AllOperationsFailed {
            failed, failures, ..
        }) => {
            let mut lines: Vec<String> = failures.iter().map(failure_line).collect();
            lines.push(format!("status: failed (0 succeeded, {failed} failed)"));

            Ok(CommandOutput {
                status: ReconciliationStatus::Failed,
                lines,
            })
        }
        Err(ReconciliationError::Gateway(error)) => Err(error),
    }
}

fn role_line(role: &Role) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{} users\t{} permissions",
        role.role_id(),
        role.name(),
        role.display_name(),
        if role.is_system() { "system" } else { "custom" },
        role.user_count(),
        role.permissions().len()
    )
}

fn plan_lines(role: &Role, plan: &MembershipPlan) -> Vec<String> {
    let mut lines: Vec<String> = plan
        .to_add()
        .iter()
        .map(|user_id| format!("+ {user_id}"))
        .chain(plan.to_remove().iter().map(|user_id| format!("- {user_id}")))
        .collect();
    lines.push(format!(
        "plan for role {}: {} to add, {} to remove",
        role.name(),
        plan.to_add().len(),
        plan.to_remove().len()
    ));
    lines
}

fn failure_line(failure: &MembershipFailure) -> String {
    format!("failed {}: {}", failure.operation, failure.error)
}
