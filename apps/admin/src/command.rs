use std::str::FromStr;

use keeper_core::{AppError, AppResult};
use keeper_domain::{PermissionId, UserId};

pub const USAGE: &str = "usage: keeper-admin <command>

commands:
  roles                                      list roles
  permissions                                list grantable permissions
  users                                      list users
  members <role>                             list users holding a role
  sync <role> [--dry-run] <user-id>...       set the exact member list of a role
  create-role <name> [<permission-id>...]    create a custom role
  delete-role <role>                         delete a custom role

<role> is a role id or a role name.";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Roles,
    Permissions,
    Users,
    Members {
        role: String,
    },
    Sync {
        role: String,
        dry_run: bool,
        user_ids: Vec<UserId>,
    },
    CreateRole {
        name: String,
        permission_ids: Vec<PermissionId>,
    },
    DeleteRole {
        role: String,
    },
}

impl AdminCommand {
    /// Parses the arguments following the program name.
    pub fn parse(args: impl IntoIterator<Item = String>) -> AppResult<Self> {
        let mut args = args.into_iter();
        let command = args
            .next()
            .ok_or_else(|| AppError::Validation("missing command".to_owned()))?;
        let rest: Vec<String> = args.collect();

        match command.as_str() {
            "roles" => no_arguments(command.as_str(), &rest).map(|()| Self::Roles),
            "permissions" => no_arguments(command.as_str(), &rest).map(|()| Self::Permissions),
            "users" => no_arguments(command.as_str(), &rest).map(|()| Self::Users),
            "members" => single_argument(command.as_str(), rest).map(|role| Self::Members { role }),
            "delete-role" => {
                single_argument(command.as_str(), rest).map(|role| Self::DeleteRole { role })
            }
            "sync" => parse_sync(rest),
            "create-role" => parse_create_role(rest),
            other => Err(AppError::Validation(format!("unknown command '{other}'"))),
        }
    }
}

fn no_arguments(command: &str, rest: &[String]) -> AppResult<()> {
    if rest.is_empty() {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "'{command}' takes no arguments, got '{}'",
        rest.join(" ")
    )))
}

fn single_argument(command: &str, rest: Vec<String>) -> AppResult<String> {
    let mut rest = rest.into_iter();
    match (rest.next(), rest.next()) {
        (Some(value), None) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Validation(format!(
            "'{command}' expects exactly one role"
        ))),
    }
}

fn parse_sync(rest: Vec<String>) -> AppResult<AdminCommand> {
    let mut role = None;
    let mut dry_run = false;
    let mut user_ids = Vec::new();

    for argument in rest {
        if argument == "--dry-run" {
            dry_run = true;
        } else if role.is_none() {
            role = Some(argument);
        } else {
            user_ids.push(UserId::from_str(argument.as_str())?);
        }
    }

    let role = role
        .filter(|role| !role.trim().is_empty())
        .ok_or_else(|| AppError::Validation("'sync' expects a role".to_owned()))?;

    Ok(AdminCommand::Sync {
        role,
        dry_run,
        user_ids,
    })
}

fn parse_create_role(rest: Vec<String>) -> AppResult<AdminCommand> {
    let mut rest = rest.into_iter();
    let name = rest
        .next()
        .ok_or_else(|| AppError::Validation("'create-role' expects a name".to_owned()))?;
    let permission_ids = rest
        .map(|value| PermissionId::from_str(value.as_str()))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(AdminCommand::CreateRole {
        name,
        permission_ids,
    })
}
