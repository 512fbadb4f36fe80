use async_trait::async_trait;

use keeper_core::AppResult;
use keeper_domain::{Permission, Role, RoleId, UserId, UserSummary};

use super::inputs::{CreateRoleInput, UpdateRoleInput};

/// Backend port for role, permission and user catalogue administration.
#[async_trait]
pub trait RoleAdminGateway: Send + Sync {
    /// Lists all roles with their grants.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Fetches one role by identifier.
    async fn get_role(&self, role_id: RoleId) -> AppResult<Role>;

    /// Creates a custom role.
    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role>;

    /// Replaces the editable attributes of a custom role.
    async fn update_role(&self, role_id: RoleId, input: UpdateRoleInput) -> AppResult<Role>;

    /// Deletes a custom role.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Lists every grantable permission.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Lists every user available for assignment.
    async fn list_users(&self) -> AppResult<Vec<UserSummary>>;
}

/// Backend port for reading and mutating role membership.
///
/// Assign and unassign are independent calls; implementations treat repeated
/// calls for the same user as no-ops.
#[async_trait]
pub trait RoleMembershipGateway: Send + Sync {
    /// Lists users currently holding the role.
    async fn list_role_members(&self, role_id: RoleId) -> AppResult<Vec<UserSummary>>;

    /// Grants the role to one user.
    async fn assign_user_to_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()>;

    /// Revokes the role from one user.
    async fn unassign_user_from_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()>;
}
