use std::collections::HashSet;

use chrono::{DateTime, Utc};
use keeper_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{Permission, RoleId, UserId};

/// Named bundle of permissions assignable to users.
///
/// Deserialization goes through [`Role::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoleInput")]
pub struct Role {
    role_id: RoleId,
    name: NonEmptyString,
    display_name: NonEmptyString,
    description: Option<String>,
    is_system: bool,
    permissions: Vec<Permission>,
    user_count: u32,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

/// Input payload used to construct a validated role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleInput {
    /// Stable role identifier.
    pub role_id: RoleId,
    /// Unique role name in tenant scope.
    pub name: String,
    /// Optional user-facing name. Falls back to `name`.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Optional role description.
    #[serde(default)]
    pub description: Option<String>,
    /// Indicates a system-managed role.
    #[serde(default)]
    pub is_system: bool,
    /// Granted permissions in display order.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Number of users currently holding the role.
    #[serde(default)]
    pub user_count: u32,
    /// Creation timestamp reported by the backend.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp reported by the backend.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Creates a validated role.
    ///
    /// Permissions keep their first-seen order; repeated identifiers are dropped.
    pub fn new(input: RoleInput) -> AppResult<Self> {
        let RoleInput {
            role_id,
            name,
            display_name,
            description,
            is_system,
            permissions,
            user_count,
            created_at,
            updated_at,
        } = input;

        let name = NonEmptyString::new(name)?;
        let display_name = match normalize_optional(display_name) {
            Some(value) => NonEmptyString::new(value)?,
            None => name.clone(),
        };

        Ok(Self {
            role_id,
            name,
            display_name,
            description: normalize_optional(description),
            is_system,
            permissions: dedupe_permissions(permissions),
            user_count,
            created_at,
            updated_at,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the user-facing role name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the optional role description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether the role is system-managed.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns granted permissions in display order.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        self.permissions.as_slice()
    }

    /// Returns the number of users holding the role.
    #[must_use]
    pub fn user_count(&self) -> u32 {
        self.user_count
    }

    /// Returns the creation timestamp, if known.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the last update timestamp, if known.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Fails with `Forbidden` for system roles, whose grants and existence are fixed.
    pub fn ensure_mutable(&self) -> AppResult<()> {
        if self.is_system {
            return Err(AppError::Forbidden(format!(
                "role '{}' is a system role and cannot be modified",
                self.name
            )));
        }

        Ok(())
    }
}

impl TryFrom<RoleInput> for Role {
    type Error = AppError;

    fn try_from(value: RoleInput) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Relation between a user and a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    /// Assigned user.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: RoleId,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim().to_owned();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

fn dedupe_permissions(permissions: Vec<Permission>) -> Vec<Permission> {
    let mut seen = HashSet::new();
    permissions
        .into_iter()
        .filter(|permission| seen.insert(permission.permission_id))
        .collect()
}
