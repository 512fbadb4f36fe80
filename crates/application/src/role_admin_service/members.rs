use std::collections::BTreeSet;

use keeper_core::AppResult;
use keeper_domain::{RoleId, UserId, UserSummary};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::{MembershipPlan, ReconciliationError, ReconciliationReport};

use super::RoleAdminService;

/// Result of saving a role's member set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSaveResult {
    /// Changes computed from the members read before the save.
    pub plan: MembershipPlan,
    /// Per-operation outcome.
    pub report: ReconciliationReport,
    /// Members read back after the save; `None` when the confirmation read failed.
    pub confirmed_members: Option<BTreeSet<UserId>>,
}

impl RoleAdminService {
    /// Returns users holding the role, sorted by username.
    pub async fn role_members(&self, role_id: RoleId) -> AppResult<Vec<UserSummary>> {
        let mut members = self.membership_gateway.list_role_members(role_id).await?;
        members.sort_by(|left, right| left.username.cmp(&right.username));
        Ok(members)
    }

    /// Computes the changes a save would issue without executing them.
    pub async fn plan_role_members(
        &self,
        role_id: RoleId,
        desired: impl IntoIterator<Item = UserId>,
    ) -> AppResult<MembershipPlan> {
        let current = self.current_member_ids(role_id).await?;
        Ok(MembershipPlan::compute(role_id, current, desired))
    }

    /// Moves the role's members to `desired` and reads them back.
    ///
    /// Partial failure is returned as `Ok` with a partial report. A batch in
    /// which nothing succeeded is returned as
    /// [`ReconciliationError::AllOperationsFailed`].
    pub async fn save_role_members(
        &self,
        role_id: RoleId,
        desired: impl IntoIterator<Item = UserId>,
    ) -> Result<MembershipSaveResult, ReconciliationError> {
        let plan = self.plan_role_members(role_id, desired).await?;
        let report = self.reconciler.execute(&plan).await.into_result()?;

        let confirmed_members = match self.current_member_ids(role_id).await {
            Ok(members) => Some(members),
            Err(error) => {
                warn!(
                    role_id = %role_id,
                    error = %error,
                    "failed to confirm role members after save"
                );
                None
            }
        };

        Ok(MembershipSaveResult {
            plan,
            report,
            confirmed_members,
        })
    }

    /// Runs [`Self::save_role_members`] on a detached task.
    ///
    /// Dropping the handle does not cancel operations already issued.
    pub fn spawn_save_role_members(
        &self,
        role_id: RoleId,
        desired: BTreeSet<UserId>,
    ) -> JoinHandle<Result<MembershipSaveResult, ReconciliationError>> {
        let service = self.clone();
        tokio::spawn(async move { service.save_role_members(role_id, desired).await })
    }

    /// Re-issues only the failed operations of a previous report.
    pub async fn retry_failed(
        &self,
        report: &ReconciliationReport,
    ) -> Result<ReconciliationReport, ReconciliationError> {
        let plan = report.retry_plan();
        self.reconciler.execute(&plan).await.into_result()
    }

    async fn current_member_ids(&self, role_id: RoleId) -> AppResult<BTreeSet<UserId>> {
        Ok(self
            .membership_gateway
            .list_role_members(role_id)
            .await?
            .into_iter()
            .map(|member| member.user_id)
            .collect())
    }
}
