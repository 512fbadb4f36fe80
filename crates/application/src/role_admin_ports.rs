mod gateway;
mod inputs;

pub use gateway::{RoleAdminGateway, RoleMembershipGateway};
pub use inputs::{CreateRoleInput, UpdateRoleInput};
