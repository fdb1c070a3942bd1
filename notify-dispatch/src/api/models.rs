//! API request and response models (DTOs).
//!
//! # Model Categories
//!
//! - **Notify**: Dispatch requests and the accepted-job response
//! - **Job**: Job status polling
//! - **Stats**: Dispatch counters and worker pool load
//! - **Health**: Health and liveness checks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Job, JobStatus, Message};
use crate::notification::NotificationStats;

// ============================================================================
// Notify
// ============================================================================

/// Request body for `POST /notify/{recipient_id}`.
///
/// ```json
/// { "title": "Deploy finished", "message": "Build 42 is live" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyRequest {
    /// Optional title, rendered as subject or heading where the channel supports it
    #[serde(default)]
    pub title: Option<String>,
    /// Message body; must not be blank
    pub message: String,
}

impl NotifyRequest {
    /// Convert to a domain message.
    pub fn into_message(self) -> Message {
        let message = Message::new(self.message);
        match self.title {
            Some(title) => message.with_title(title),
            None => message,
        }
    }
}

/// Response for an accepted notification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyAcceptedResponse {
    pub job_id: String,
    pub status: JobStatus,
}

impl From<&Job> for NotifyAcceptedResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// Response for `GET /jobs/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            created_at: job.created_at,
            status: job.status,
        }
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Dispatch counters plus current worker pool load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub dispatch: NotificationStats,
    pub pending_jobs: usize,
    pub succeeded_jobs: usize,
    pub failed_jobs: usize,
    pub active_dispatches: usize,
    pub queued_dispatches: usize,
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Liveness check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub uptime_secs: u64,
}
