//! Application services and ports.

#![forbid(unsafe_code)]

mod reconciliation;
mod role_admin_ports;
mod role_admin_service;

#[cfg(test)]
mod test_fakes;

pub use reconciliation::{
    MembershipFailure, MembershipOperation, MembershipOperationResult, MembershipPlan,
    ReconcilerConfig, ReconciliationError, ReconciliationReport, ReconciliationStatus,
    RoleUserReconciler,
};
pub use role_admin_ports::{
    CreateRoleInput, RoleAdminGateway, RoleMembershipGateway, UpdateRoleInput,
};
pub use role_admin_service::{MembershipSaveResult, RoleAdminService};
