use std::collections::HashSet;
use std::str::FromStr;

use keeper_core::{AppError, AppResult, NonEmptyString};
use keeper_domain::{Permission, PermissionId, Role, RoleId, UserSummary};
use tracing::info;

use crate::{CreateRoleInput, UpdateRoleInput};

use super::RoleAdminService;

impl RoleAdminService {
    /// Returns all roles sorted by name.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles = self.gateway.list_roles().await?;
        roles.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(roles)
    }

    /// Resolves a role from its identifier or its name.
    pub async fn find_role(&self, role_ref: &str) -> AppResult<Role> {
        if let Ok(role_id) = RoleId::from_str(role_ref) {
            return self.gateway.get_role(role_id).await;
        }

        let wanted = role_ref.trim();
        self.gateway
            .list_roles()
            .await?
            .into_iter()
            .find(|role| role.name().as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::NotFound(format!("role '{wanted}' does not exist")))
    }

    /// Returns all permissions sorted by resource and action.
    pub async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut permissions = self.gateway.list_permissions().await?;
        permissions.sort_by(|left, right| {
            (&left.resource, left.action).cmp(&(&right.resource, right.action))
        });
        Ok(permissions)
    }

    /// Returns all users sorted by username.
    pub async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        let mut users = self.gateway.list_users().await?;
        users.sort_by(|left, right| left.username.cmp(&right.username));
        Ok(users)
    }

    /// Creates a custom role.
    pub async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let name = NonEmptyString::new(input.name)?;
        let role = self
            .gateway
            .create_role(CreateRoleInput {
                name: name.into(),
                display_name: normalize_optional(input.display_name),
                description: normalize_optional(input.description),
                permission_ids: dedupe_permission_ids(input.permission_ids),
            })
            .await?;

        info!(role_id = %role.role_id(), role_name = %role.name(), "role created");
        Ok(role)
    }

    /// Updates a custom role. System roles are rejected before any remote mutation.
    pub async fn update_role(&self, role_id: RoleId, input: UpdateRoleInput) -> AppResult<Role> {
        self.require_mutable_role(role_id).await?;

        let role = self
            .gateway
            .update_role(
                role_id,
                UpdateRoleInput {
                    display_name: normalize_optional(input.display_name),
                    description: normalize_optional(input.description),
                    permission_ids: dedupe_permission_ids(input.permission_ids),
                },
            )
            .await?;

        info!(role_id = %role_id, role_name = %role.name(), "role updated");
        Ok(role)
    }

    /// Deletes a custom role. System roles are rejected before any remote mutation.
    pub async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.require_mutable_role(role_id).await?;
        self.gateway.delete_role(role_id).await?;

        info!(role_id = %role_id, "role deleted");
        Ok(())
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim().to_owned();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

fn dedupe_permission_ids(permission_ids: Vec<PermissionId>) -> Vec<PermissionId> {
    let mut seen = HashSet::new();
    permission_ids
        .into_iter()
        .filter(|permission_id| seen.insert(*permission_id))
        .collect()
}
