use std::sync::Arc;

use keeper_core::AppResult;
use keeper_domain::RoleId;

use crate::{ReconcilerConfig, RoleAdminGateway, RoleMembershipGateway, RoleUserReconciler};

mod members;
mod roles;


pub use members::MembershipSaveResult;

/// Application service for role administration workflows.
#[derive(Clone)]
pub struct RoleAdminService {
    gateway: Arc<dyn RoleAdminGateway>,
    membership_gateway: Arc<dyn RoleMembershipGateway>,
    reconciler: RoleUserReconciler,
}

impl RoleAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn RoleAdminGateway>,
        membership_gateway: Arc<dyn RoleMembershipGateway>,
        reconciler_config: ReconcilerConfig,
    ) -> Self {
        let reconciler = RoleUserReconciler::new(membership_gateway.clone(), reconciler_config);
        Self {
            gateway,
            membership_gateway,
            reconciler,
        }
    }

    /// Creates a service from one adapter implementing both ports.
    #[must_use]
    pub fn from_gateway<G>(gateway: Arc<G>, reconciler_config: ReconcilerConfig) -> Self
    where
        G: RoleAdminGateway + RoleMembershipGateway + 'static,
    {
        Self::new(gateway.clone(), gateway, reconciler_config)
    }

    /// Returns the reconciler used for membership saves.
    #[must_use]
    pub fn reconciler(&self) -> &RoleUserReconciler {
        &self.reconciler
    }

    async fn require_mutable_role(&self, role_id: RoleId) -> AppResult<()> {
        self.gateway.get_role(role_id).await?.ensure_mutable()
    }
}
