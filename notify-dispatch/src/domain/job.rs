//! Dispatch job state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Lifecycle states of a dispatch job.
///
/// A job starts as `Pending` and moves exactly once to one of the terminal
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Dispatch is queued or still trying channels.
    #[default]
    Pending,
    /// One channel delivered the message.
    Success,
    /// Every eligible channel was exhausted, or the recipient vanished.
    Failed,
}

impl JobStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Whether the status can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Validate a state transition.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Success) | (Self::Pending, Self::Failed)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&self, target: JobStatus) -> Result<JobStatus, Error> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(Error::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single dispatch request as seen by a polling client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Opaque job identifier.
    pub id: String,
    /// When the job was accepted.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: JobStatus,
}

impl Job {
    /// Create a new pending job with a fresh UUID.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create a pending job with a caller-chosen id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            status: JobStatus::Pending,
        }
    }

    /// Move the job to `target`, rejecting anything but pending -> terminal.
    pub fn transition(&mut self, target: JobStatus) -> Result<(), Error> {
        self.status = self.status.transition_to(target)?;
        Ok(())
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}
