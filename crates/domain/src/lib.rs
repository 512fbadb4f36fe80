//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod ids;
mod role;
mod security;
mod user;

pub use ids::{PermissionId, RoleId, UserId};
pub use role::{Role, RoleInput, UserRoleAssignment};
pub use security::{Permission, PermissionAction, ResourceCategory};
pub use user::UserSummary;
