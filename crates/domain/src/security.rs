use std::fmt::{Display, Formatter};
use std::str::FromStr;

use keeper_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::PermissionId;

/// Actions a permission can grant on a resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    /// Allows reading resources.
    Read,
    /// Allows writing resources.
    Write,
    /// Allows deleting resources.
    Delete,
    /// Allows administering resources.
    Admin,
    /// Allows creating resources.
    Create,
    /// Allows updating resources.
    Update,
}

impl PermissionAction {
    /// Returns a stable transport value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Admin => "admin",
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "delete" => Ok(Self::Delete),
            "admin" => Ok(Self::Admin),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            _ => Err(AppError::Validation(format!(
                "unknown permission action '{value}'"
            ))),
        }
    }
}

impl Display for PermissionAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Resource category a permission applies to, e.g. `artifacts` or `repositories`.
///
/// Categories are normalised to lowercase tokens of ASCII letters, digits,
/// `_`, `-` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceCategory(String);

impl ResourceCategory {
    /// Creates a validated resource category.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into().trim().to_ascii_lowercase();
        if value.is_empty() {
            return Err(AppError::Validation(
                "resource category must not be empty".to_owned(),
            ));
        }

        if let Some(invalid) = value
            .chars()
            .find(|character| !matches!(character, 'a'..='z' | '0'..='9' | '_' | '-' | '.'))
        {
            return Err(AppError::Validation(format!(
                "resource category '{value}' contains invalid character '{invalid}'"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the category token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for ResourceCategory {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceCategory> for String {
    fn from(value: ResourceCategory) -> Self {
        value.0
    }
}

impl Display for ResourceCategory {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Atomic grant of one action on one resource category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub permission_id: PermissionId,
    /// Resource category the grant applies to.
    pub resource: ResourceCategory,
    /// Granted action.
    pub action: PermissionAction,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl Permission {
    /// Returns the `resource:action` key for this permission.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}
