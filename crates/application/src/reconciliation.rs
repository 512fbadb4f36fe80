//! Role member reconciliation: planning, best-effort execution and reporting.

mod plan;
mod reconciler;
mod report;


pub use plan::{MembershipOperation, MembershipPlan};
pub use reconciler::{ReconcilerConfig, RoleUserReconciler};
pub use report::{
    MembershipFailure, MembershipOperationResult, ReconciliationError, ReconciliationReport,
    ReconciliationStatus,
};
