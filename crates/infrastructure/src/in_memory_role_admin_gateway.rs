use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use keeper_application::{
    CreateRoleInput, RoleAdminGateway, RoleMembershipGateway, UpdateRoleInput,
};
use keeper_core::{AppError, AppResult};
use keeper_domain::{
    Permission, PermissionId, Role, RoleId, RoleInput, UserId, UserRoleAssignment, UserSummary,
};
use tokio::sync::RwLock;


/// In-memory role administration backend.
///
/// Mirrors the REST backend's rules: unique role names, immutable system
/// roles, idempotent membership changes. Unassigning a user the role does
/// not hold succeeds, as it does over HTTP. Users registered with
/// [`Self::fail_operations_for`] make every assign or unassign for them fail.
#[derive(Debug, Default)]
pub struct InMemoryRoleAdminGateway {
    roles: RwLock<BTreeMap<RoleId, Role>>,
    permissions: RwLock<BTreeMap<PermissionId, Permission>>,
    users: RwLock<BTreeMap<UserId, UserSummary>>,
    assignments: RwLock<BTreeSet<UserRoleAssignment>>,
    failing_users: RwLock<HashSet<UserId>>,
}

impl InMemoryRoleAdminGateway {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a grantable permission.
    pub async fn insert_permission(&self, permission: Permission) {
        self.permissions
            .write()
            .await
            .insert(permission.permission_id, permission);
    }

    /// Registers a user.
    pub async fn insert_user(&self, user: UserSummary) {
        self.users.write().await.insert(user.user_id, user);
    }

    /// Registers a role as-is, including system roles.
    pub async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        ensure_unique_name(&roles, role.name().as_str(), Some(role.role_id()))?;
        roles.insert(role.role_id(), role);
        Ok(())
    }

    /// Makes membership operations for the user fail until cleared.
    pub async fn fail_operations_for(&self, user_id: UserId) {
        self.failing_users.write().await.insert(user_id);
    }

    /// Clears every injected failure.
    pub async fn clear_failures(&self) {
        self.failing_users.write().await.clear();
    }

    async fn resolve_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<Vec<Permission>> {
        let permissions = self.permissions.read().await;
        permission_ids
            .iter()
            .map(|permission_id| {
                permissions.get(permission_id).cloned().ok_or_else(|| {
                    AppError::Validation(format!("unknown permission '{permission_id}'"))
                })
            })
            .collect()
    }

    async fn member_count(&self, role_id: RoleId) -> u32 {
        let count = self
            .assignments
            .read()
            .await
            .iter()
            .filter(|assignment| assignment.role_id == role_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    async fn with_member_count(&self, role: Role) -> AppResult<Role> {
        let user_count = self.member_count(role.role_id()).await;
        Role::new(RoleInput {
            role_id: role.role_id(),
            name: role.name().as_str().to_owned(),
            display_name: Some(role.display_name().as_str().to_owned()),
            description: role.description().map(str::to_owned),
            is_system: role.is_system(),
            permissions: role.permissions().to_vec(),
            user_count,
            created_at: role.created_at(),
            updated_at: role.updated_at(),
        })
    }

    async fn stored_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.roles
            .read()
            .await
            .get(&role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn check_membership_call(&self, role_id: RoleId, user_id: UserId) -> AppResult<()> {
        self.stored_role(role_id).await?;

        if self.failing_users.read().await.contains(&user_id) {
            return Err(AppError::Internal(format!(
                "injected failure for user '{user_id}'"
            )));
        }

        Ok(())
    }
}

fn ensure_unique_name(
    roles: &BTreeMap<RoleId, Role>,
    name: &str,
    except: Option<RoleId>,
) -> AppResult<()> {
    let taken = roles.values().any(|role| {
        Some(role.role_id()) != except && role.name().as_str().eq_ignore_ascii_case(name.trim())
    });

    if taken {
        return Err(AppError::Conflict(format!(
            "role '{}' already exists",
            name.trim()
        )));
    }

    Ok(())
}

#[async_trait]
impl RoleAdminGateway for InMemoryRoleAdminGateway {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        let mut counted = Vec::with_capacity(roles.len());
        for role in roles {
            counted.push(self.with_member_count(role).await?);
        }

        Ok(counted)
    }

    async fn get_role(&self, role_id: RoleId) -> AppResult<Role> {
        let role = self.stored_role(role_id).await?;
        self.with_member_count(role).await
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let permissions = self.resolve_permissions(&input.permission_ids).await?;
        let role = Role::new(RoleInput {
            role_id: RoleId::new(),
            name: input.name,
            display_name: input.display_name,
            description: input.description,
            is_system: false,
            permissions,
            user_count: 0,
            created_at: Some(chrono::Utc::now()),
            updated_at: None,
        })?;

        let mut roles = self.roles.write().await;
        ensure_unique_name(&roles, role.name().as_str(), None)?;
        roles.insert(role.role_id(), role.clone());
        Ok(role)
    }

    async fn update_role(&self, role_id: RoleId, input: UpdateRoleInput) -> AppResult<Role> {
        let permissions = self.resolve_permissions(&input.permission_ids).await?;

        let updated = {
            let mut roles = self.roles.write().await;
            let existing = roles
                .get(&role_id)
                .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
            existing.ensure_mutable()?;

            let updated = Role::new(RoleInput {
                role_id,
                name: existing.name().as_str().to_owned(),
                display_name: input.display_name,
                description: input.description,
                is_system: false,
                permissions,
                user_count: 0,
                created_at: existing.created_at(),
                updated_at: Some(chrono::Utc::now()),
            })?;
            roles.insert(role_id, updated.clone());
            updated
        };

        self.with_member_count(updated).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        roles
            .get(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?
            .ensure_mutable()?;
        roles.remove(&role_id);

        self.assignments
            .write()
            .await
            .retain(|assignment| assignment.role_id != role_id);
        Ok(())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.read().await.values().cloned().collect())
    }

    async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        Ok(self.users.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl RoleMembershipGateway for InMemoryRoleAdminGateway {
    async fn list_role_members(&self, role_id: RoleId) -> AppResult<Vec<UserSummary>> {
        self.stored_role(role_id).await?;

        let assignments = self.assignments.read().await;
        let users = self.users.read().await;
        Ok(assignments
            .iter()
            .filter(|assignment| assignment.role_id == role_id)
            .filter_map(|assignment| users.get(&assignment.user_id).cloned())
            .collect())
    }

    async fn assign_user_to_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()> {
        self.check_membership_call(role_id, user_id).await?;
        if !self.users.read().await.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user '{user_id}' does not exist")));
        }

        self.assignments
            .write()
            .await
            .insert(UserRoleAssignment { user_id, role_id });
        Ok(())
    }

    /// Unknown users hold no role, so removing them is a no-op.
    async fn unassign_user_from_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()> {
        self.check_membership_call(role_id, user_id).await?;
        self.assignments
            .write()
            .await
            .remove(&UserRoleAssignment { user_id, role_id });
        Ok(())
    }
}
