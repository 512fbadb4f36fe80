use keeper_domain::PermissionId;

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name in tenant scope.
    pub name: String,
    /// Optional user-facing name.
    pub display_name: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Grants to attach to the role, in display order.
    pub permission_ids: Vec<PermissionId>,
}

/// Input payload for editing custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// Optional user-facing name.
    pub display_name: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Full replacement grant list, in display order.
    pub permission_ids: Vec<PermissionId>,
}
