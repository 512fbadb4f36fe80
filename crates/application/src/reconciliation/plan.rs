use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use keeper_domain::{RoleId, UserId};

/// One remote membership mutation for a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MembershipOperation {
    /// Grants the role to the user.
    Assign(UserId),
    /// Revokes the role from the user.
    Unassign(UserId),
}

impl MembershipOperation {
    /// Returns the affected user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Assign(user_id) | Self::Unassign(user_id) => *user_id,
        }
    }

    /// Returns a stable label for logs and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign(_) => "assign",
            Self::Unassign(_) => "unassign",
        }
    }
}

impl Display for MembershipOperation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} {}", self.as_str(), self.user_id())
    }
}

/// Minimal set of membership changes moving a role from its current to its desired members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipPlan {
    role_id: RoleId,
    to_add: BTreeSet<UserId>,
    to_remove: BTreeSet<UserId>,
}

impl MembershipPlan {
    /// Computes `desired − current` as additions and `current − desired` as removals.
    ///
    /// Inputs are treated as sets; duplicates collapse.
    #[must_use]
    pub fn compute(
        role_id: RoleId,
        current: impl IntoIterator<Item = UserId>,
        desired: impl IntoIterator<Item = UserId>,
    ) -> Self {
        let current: BTreeSet<UserId> = current.into_iter().collect();
        let desired: BTreeSet<UserId> = desired.into_iter().collect();

        Self {
            role_id,
            to_add: desired.difference(&current).copied().collect(),
            to_remove: current.difference(&desired).copied().collect(),
        }
    }

    /// Builds a plan from explicit operations, e.g. the failed subset of a previous run.
    #[must_use]
    pub fn from_operations(
        role_id: RoleId,
        operations: impl IntoIterator<Item = MembershipOperation>,
    ) -> Self {
        let mut plan = Self {
            role_id,
            to_add: BTreeSet::new(),
            to_remove: BTreeSet::new(),
        };

        for operation in operations {
            match operation {
                MembershipOperation::Assign(user_id) => {
                    plan.to_remove.remove(&user_id);
                    plan.to_add.insert(user_id);
                }
                MembershipOperation::Unassign(user_id) => {
                    plan.to_add.remove(&user_id);
                    plan.to_remove.insert(user_id);
                }
            }
        }

        plan
    }

    /// Returns the role the plan targets.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns users to grant the role to.
    #[must_use]
    pub fn to_add(&self) -> &BTreeSet<UserId> {
        &self.to_add
    }

    /// Returns users to revoke the role from.
    #[must_use]
    pub fn to_remove(&self) -> &BTreeSet<UserId> {
        &self.to_remove
    }

    /// Returns the number of remote calls the plan issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    /// Returns whether current and desired members already match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Iterates assignments first, then removals.
    pub fn operations(&self) -> impl Iterator<Item = MembershipOperation> + '_ {
        self.to_add
            .iter()
            .copied()
            .map(MembershipOperation::Assign)
            .chain(
                self.to_remove
                    .iter()
                    .copied()
                    .map(MembershipOperation::Unassign),
            )
    }
}
