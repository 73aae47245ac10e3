//! The lifecycle state as a single tagged union.

use crate::core::error::JobError;
use crate::core::models::{Job, ResultSet, VerificationOptions};

/// Where the controller is in the submit → poll → fetch cycle.
///
/// Results only exist in `Completed`, and a job only exists once the service
/// has assigned an id, so the combinations a flat set of fields would allow
/// (results while pending, polling without a job) cannot be represented.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Submitting {
        options: VerificationOptions,
    },
    Polling {
        job: Job,
    },
    Fetching {
        job: Job,
    },
    Completed {
        job: Job,
        results: ResultSet,
    },
    /// Absorbing until acknowledged or superseded by a new submission.
    Errored {
        error: JobError,
        job: Option<Job>,
    },
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Submitting { .. } => "submitting",
            LifecycleState::Polling { .. } => "polling",
            LifecycleState::Fetching { .. } => "fetching",
            LifecycleState::Completed { .. } => "completed",
            LifecycleState::Errored { .. } => "errored",
        }
    }

    /// A network call for this lifecycle is (or may be) outstanding.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            LifecycleState::Submitting { .. }
                | LifecycleState::Polling { .. }
                | LifecycleState::Fetching { .. }
        )
    }

    /// Nothing further will happen without caller action.
    pub fn is_settled(&self) -> bool {
        !self.is_active()
    }

    pub fn job(&self) -> Option<&Job> {
        match self {
            LifecycleState::Polling { job }
            | LifecycleState::Fetching { job }
            | LifecycleState::Completed { job, .. } => Some(job),
            LifecycleState::Errored { job, .. } => job.as_ref(),
            LifecycleState::Idle | LifecycleState::Submitting { .. } => None,
        }
    }

    pub fn results(&self) -> Option<&ResultSet> {
        match self {
            LifecycleState::Completed { results, .. } => Some(results),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match self {
            LifecycleState::Errored { error, .. } => Some(error),
            _ => None,
        }
    }
}
