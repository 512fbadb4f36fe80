use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use keeper_core::AppError;
use keeper_domain::{RoleId, UserId};
use tracing::{debug, info, warn};

use crate::RoleMembershipGateway;

use super::plan::{MembershipOperation, MembershipPlan};
use super::report::{MembershipFailure, MembershipOperationResult, ReconciliationReport};

/// Tuning for reconciliation batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Upper bound for a single assign or unassign call.
    pub call_timeout: Duration,
    /// Number of operations in flight at once.
    pub max_concurrency: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            max_concurrency: 8,
        }
    }
}

/// Executes membership plans against the backend, one independent call per user.
#[derive(Clone)]
pub struct RoleUserReconciler {
    gateway: Arc<dyn RoleMembershipGateway>,
    config: ReconcilerConfig,
}

impl RoleUserReconciler {
    /// Creates a reconciler over a membership gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn RoleMembershipGateway>, config: ReconcilerConfig) -> Self {
        Self {
            gateway,
            config: ReconcilerConfig {
                call_timeout: config.call_timeout,
                max_concurrency: config.max_concurrency.max(1),
            },
        }
    }

    /// Returns the effective configuration.
    #[must_use]
    pub fn config(&self) -> ReconcilerConfig {
        self.config
    }

    /// Plans and executes the changes moving `current` to `desired`.
    pub async fn reconcile(
        &self,
        role_id: RoleId,
        current: impl IntoIterator<Item = UserId>,
        desired: impl IntoIterator<Item = UserId>,
    ) -> ReconciliationReport {
        let plan = MembershipPlan::compute(role_id, current, desired);
        self.execute(&plan).await
    }

    /// Executes every operation of the plan. Individual failures never stop the batch.
    pub async fn execute(&self, plan: &MembershipPlan) -> ReconciliationReport {
        let role_id = plan.role_id();
        if plan.is_empty() {
            debug!(role_id = %role_id, "role members already match, nothing to reconcile");
            return ReconciliationReport::empty(role_id);
        }

        info!(
            role_id = %role_id,
            to_add = plan.to_add().len(),
            to_remove = plan.to_remove().len(),
            max_concurrency = self.config.max_concurrency,
            "reconciling role members"
        );

        let results: Vec<MembershipOperationResult> = stream::iter(plan.operations())
            .map(|operation| self.apply(role_id, operation))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let report = ReconciliationReport::from_results(role_id, results);

        info!(
            role_id = %role_id,
            status = report.status().as_str(),
            attempted = report.attempted(),
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "role member reconciliation finished"
        );

        report
    }

    async fn apply(
        &self,
        role_id: RoleId,
        operation: MembershipOperation,
    ) -> MembershipOperationResult {
        let call = async {
            match operation {
                MembershipOperation::Assign(user_id) => {
                    self.gateway.assign_user_to_role(role_id, user_id).await
                }
                MembershipOperation::Unassign(user_id) => {
                    self.gateway.unassign_user_from_role(role_id, user_id).await
                }
            }
        };

        let result = match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{} of user '{}' on role '{role_id}' exceeded {} ms",
                operation.as_str(),
                operation.user_id(),
                self.config.call_timeout.as_millis()
            ))),
        };

        match result {
            Ok(()) => {
                debug!(
                    role_id = %role_id,
                    user_id = %operation.user_id(),
                    operation = operation.as_str(),
                    "role membership operation applied"
                );
                Ok(operation)
            }
            Err(error) => {
                warn!(
                    role_id = %role_id,
                    user_id = %operation.user_id(),
                    operation = operation.as_str(),
                    error = %error,
                    "role membership operation failed"
                );
                Err(MembershipFailure { operation, error })
            }
        }
    }
}
