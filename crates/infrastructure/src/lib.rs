//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_role_admin_gateway;
mod in_memory_role_admin_gateway;

pub use http_role_admin_gateway::{
    HttpRoleAdminGateway, HttpRoleAdminGatewayConfig, TENANT_HEADER,
};
pub use in_memory_role_admin_gateway::InMemoryRoleAdminGateway;
