use chrono::{DateTime, Utc};
use keeper_core::AppResult;
use keeper_domain::{
    Permission, PermissionAction, PermissionId, ResourceCategory, Role, RoleId, RoleInput, UserId,
    UserSummary,
};
use serde::{Deserialize, Serialize};

/// List payloads arrive either bare or wrapped in an `items` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ListResponse<T> {
    Envelope { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub(super) fn into_items(self) -> Vec<T> {
        match self {
            Self::Envelope { items } | Self::Bare(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PermissionResponse {
    #[serde(alias = "id")]
    pub(super) permission_id: PermissionId,
    #[serde(alias = "resource_type")]
    pub(super) resource: ResourceCategory,
    pub(super) action: PermissionAction,
    #[serde(default)]
    pub(super) description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RoleResponse {
    #[serde(alias = "id")]
    pub(super) role_id: RoleId,
    pub(super) name: String,
    #[serde(default)]
    pub(super) display_name: Option<String>,
    #[serde(default)]
    pub(super) description: Option<String>,
    #[serde(default)]
    pub(super) is_system: bool,
    #[serde(default)]
    pub(super) permissions: Vec<PermissionResponse>,
    #[serde(default)]
    pub(super) user_count: u32,
    #[serde(default)]
    pub(super) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(super) updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserResponse {
    #[serde(alias = "id")]
    pub(super) user_id: UserId,
    pub(super) username: String,
    #[serde(default)]
    pub(super) display_name: Option<String>,
    #[serde(default)]
    pub(super) email: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateRoleRequest<'a> {
    pub(super) name: &'a str,
    pub(super) display_name: Option<&'a str>,
    pub(super) description: Option<&'a str>,
    pub(super) permission_ids: &'a [PermissionId],
}

#[derive(Debug, Serialize)]
pub(super) struct UpdateRoleRequest<'a> {
    pub(super) display_name: Option<&'a str>,
    pub(super) description: Option<&'a str>,
    pub(super) permission_ids: &'a [PermissionId],
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorResponse {
    #[serde(default)]
    pub(super) message: Option<String>,
    #[serde(default)]
    pub(super) error: Option<String>,
}

impl ErrorResponse {
    pub(super) fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

impl From<PermissionResponse> for Permission {
    fn from(value: PermissionResponse) -> Self {
        Self {
            permission_id: value.permission_id,
            resource: value.resource,
            action: value.action,
            description: value.description.unwrap_or_default(),
        }
    }
}

impl RoleResponse {
    pub(super) fn into_role(self) -> AppResult<Role> {
        Role::new(RoleInput {
            role_id: self.role_id,
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            is_system: self.is_system,
            permissions: self.permissions.into_iter().map(Permission::from).collect(),
            user_count: self.user_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<UserResponse> for UserSummary {
    fn from(value: UserResponse) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username,
            display_name: value.display_name,
            email: value.email,
        }
    }
}
