use keeper_core::AppError;
use keeper_domain::RoleId;
use thiserror::Error;

use super::plan::{MembershipOperation, MembershipPlan};

/// A membership operation that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipFailure {
    /// Operation that failed.
    pub operation: MembershipOperation,
    /// Remote or timeout error reported for the operation.
    pub error: AppError,
}

/// Outcome of one membership operation.
pub type MembershipOperationResult = Result<MembershipOperation, MembershipFailure>;

/// Aggregate status of a reconciliation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconciliationStatus {
    /// Every operation succeeded, including the empty batch.
    Succeeded,
    /// Some operations succeeded and some failed.
    PartiallySucceeded,
    /// Operations were attempted and none succeeded.
    Failed,
}

impl ReconciliationStatus {
    /// Reduces success and failure counts into a status.
    #[must_use]
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => Self::Succeeded,
            (0, _) => Self::Failed,
            _ => Self::PartiallySucceeded,
        }
    }

    /// Returns a stable label for logs and output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PartiallySucceeded => "partially_succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Errors surfaced by role member reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// Every attempted operation failed.
    #[error("all {failed} role membership operations failed for role '{role_id}'")]
    AllOperationsFailed {
        /// Role the batch targeted.
        role_id: RoleId,
        /// Number of failed operations.
        failed: usize,
        /// Individual failures.
        failures: Vec<MembershipFailure>,
    },

    /// A gateway call outside the batch failed, e.g. reading current members.
    #[error(transparent)]
    Gateway(#[from] AppError),
}

/// Per-operation results of one reconciliation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    role_id: RoleId,
    succeeded: Vec<MembershipOperation>,
    failures: Vec<MembershipFailure>,
}

impl ReconciliationReport {
    /// Creates a report for a batch that issued no operations.
    #[must_use]
    pub fn empty(role_id: RoleId) -> Self {
        Self {
            role_id,
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Folds operation results into a report. Entries are sorted by operation.
    #[must_use]
    pub fn from_results(
        role_id: RoleId,
        results: impl IntoIterator<Item = MembershipOperationResult>,
    ) -> Self {
        let mut report = results
            .into_iter()
            .fold(Self::empty(role_id), |mut report, result| {
                match result {
                    Ok(operation) => report.succeeded.push(operation),
                    Err(failure) => report.failures.push(failure),
                }
                report
            });

        report.succeeded.sort();
        report
            .failures
            .sort_by(|left, right| left.operation.cmp(&right.operation));
        report
    }

    /// Returns the reconciled role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the number of operations issued.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    /// Returns the number of successful operations.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Returns the number of failed operations.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Returns successful operations.
    #[must_use]
    pub fn succeeded(&self) -> &[MembershipOperation] {
        self.succeeded.as_slice()
    }

    /// Returns failed operations with their errors.
    #[must_use]
    pub fn failures(&self) -> &[MembershipFailure] {
        self.failures.as_slice()
    }

    /// Returns the aggregate status.
    #[must_use]
    pub fn status(&self) -> ReconciliationStatus {
        ReconciliationStatus::from_counts(self.success_count(), self.failure_count())
    }

    /// Returns a plan holding only the failed operations.
    #[must_use]
    pub fn retry_plan(&self) -> MembershipPlan {
        MembershipPlan::from_operations(
            self.role_id,
            self.failures.iter().map(|failure| failure.operation),
        )
    }

    /// Converts a batch where nothing succeeded into an error.
    pub fn into_result(self) -> Result<Self, ReconciliationError> {
        match self.status() {
            ReconciliationStatus::Failed => Err(ReconciliationError::AllOperationsFailed {
                role_id: self.role_id,
                failed: self.failures.len(),
                failures: self.failures,
            }),
            ReconciliationStatus::Succeeded | ReconciliationStatus::PartiallySucceeded => {
                Ok(self)
            }
        }
    }
}
