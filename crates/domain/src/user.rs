//! User projections consumed by role administration.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// User summary listed for selection and role membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserSummary {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Login name.
    pub username: String,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Optional email address.
    #[serde(default)]
    pub email: Option<String>,
}

impl UserSummary {
    /// Returns the display name when present, otherwise the username.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.username.as_str())
    }
}
