use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use keeper_core::{AppError, AppResult};
use keeper_domain::{Permission, Role, RoleId, RoleInput, UserId, UserSummary};

use crate::{
    CreateRoleInput, MembershipOperation, RoleAdminGateway, RoleMembershipGateway,
    UpdateRoleInput,
};

/// Backend fake shared by application tests.
#[derive(Default)]
pub(crate) struct FakeRoleBackend {
    pub(crate) roles: Mutex<BTreeMap<RoleId, Role>>,
    pub(crate) members: Mutex<BTreeMap<RoleId, BTreeSet<UserId>>>,
    pub(crate) failing_users: HashSet<UserId>,
    pub(crate) slow_users: HashSet<UserId>,
    pub(crate) slow_delay: Duration,
    pub(crate) fail_member_reads_after: Option<usize>,
    pub(crate) member_reads: AtomicUsize,
    pub(crate) calls: Mutex<Vec<MembershipOperation>>,
    pub(crate) mutations: Mutex<Vec<String>>,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl FakeRoleBackend {
    pub(crate) async fn seed_role(&self, name: &str, is_system: bool) -> Role {
        let role = Role::new(RoleInput {
            role_id: RoleId::new(),
            name: name.to_owned(),
            display_name: None,
            description: None,
            is_system,
            permissions: Vec::new(),
            user_count: 0,
            created_at: None,
            updated_at: None,
        })
        .unwrap_or_else(|_| unreachable!());
        self.roles.lock().await.insert(role.role_id(), role.clone());
        role
    }

    pub(crate) async fn seed_members(&self, role_id: RoleId, users: &[UserId]) {
        self.members
            .lock()
            .await
            .insert(role_id, users.iter().copied().collect());
    }

    pub(crate) async fn members_of(&self, role_id: RoleId) -> BTreeSet<UserId> {
        self.members
            .lock()
            .await
            .get(&role_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn record(&self, operation: MembershipOperation) -> AppResult<()> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        self.calls.lock().await.push(operation);

        let user_id = operation.user_id();
        let delay = if self.slow_users.contains(&user_id) {
            self.slow_delay
        } else {
            Duration::from_millis(5)
        };
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_users.contains(&user_id) {
            return Err(AppError::Internal(format!(
                "backend rejected {operation}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RoleAdminGateway for FakeRoleBackend {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.lock().await.values().cloned().collect())
    }

    async fn get_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.roles
            .lock()
            .await
            .get(&role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        self.mutations
            .lock()
            .await
            .push(format!("create {}", input.name));
        let role = Role::new(RoleInput {
            role_id: RoleId::new(),
            name: input.name,
            display_name: input.display_name,
            description: input.description,
            is_system: false,
            permissions: Vec::new(),
            user_count: 0,
            created_at: None,
            updated_at: None,
        })?;
        self.roles.lock().await.insert(role.role_id(), role.clone());
        Ok(role)
    }

    async fn update_role(&self, role_id: RoleId, input: UpdateRoleInput) -> AppResult<Role> {
        self.mutations.lock().await.push(format!("update {role_id}"));
        let mut roles = self.roles.lock().await;
        let existing = roles
            .get(&role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        let updated = Role::new(RoleInput {
            role_id,
            name: existing.name().as_str().to_owned(),
            display_name: input.display_name,
            description: input.description,
            is_system: existing.is_system(),
            permissions: existing.permissions().to_vec(),
            user_count: existing.user_count(),
            created_at: None,
            updated_at: None,
        })?;
        roles.insert(role_id, updated.clone());
        Ok(updated)
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.mutations.lock().await.push(format!("delete {role_id}"));
        self.roles.lock().await.remove(&role_id);
        Ok(())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(Vec::new())
    }

    async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl RoleMembershipGateway for FakeRoleBackend {
    async fn list_role_members(&self, role_id: RoleId) -> AppResult<Vec<UserSummary>> {
        let reads = self.member_reads.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_member_reads_after
            .is_some_and(|allowed| reads >= allowed)
        {
            return Err(AppError::Internal("member listing unavailable".to_owned()));
        }

        Ok(self
            .members_of(role_id)
            .await
            .into_iter()
            .map(|user_id| UserSummary {
                user_id,
                username: format!("user-{user_id}"),
                display_name: None,
                email: None,
            })
            .collect())
    }

    async fn assign_user_to_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()> {
        self.record(MembershipOperation::Assign(user_id)).await?;
        self.members
            .lock()
            .await
            .entry(role_id)
            .or_default()
            .insert(user_id);
        Ok(())
    }

    async fn unassign_user_from_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()> {
        self.record(MembershipOperation::Unassign(user_id)).await?;
        if let Some(members) = self.members.lock().await.get_mut(&role_id) {
            members.remove(&user_id);
        }
        Ok(())
    }
}
