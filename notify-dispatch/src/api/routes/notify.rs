//! Notification intake routes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/notify/{recipient_id}` | Queue a notification for a recipient |

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{NotifyAcceptedResponse, NotifyRequest};
use crate::api::server::AppState;
use crate::domain::{Job, JobStatus};
use crate::notification::DispatchRequest;

/// Create the notify router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{recipient_id}", post(notify_recipient))
}

/// Accept a notification and dispatch it in the background.
///
/// The recipient is checked before a job is created, so an unknown recipient
/// leaves no job behind.
async fn notify_recipient(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
    Json(request): Json<NotifyRequest>,
) -> ApiResult<(StatusCode, Json<NotifyAcceptedResponse>)> {
    if request.message.trim().is_empty() {
        return Err(ApiError::validation("Message body must not be empty")
            .with_details(serde_json::json!({ "field": "message" })));
    }

    if !state
        .recipient_repository
        .recipient_exists(&recipient_id)
        .await?
    {
        return Err(ApiError::not_found(format!(
            "Recipient with id '{}' not found",
            recipient_id
        )));
    }

    let job = Job::new();
    state.job_repository.create_job(&job).await?;

    let submitted = state.worker_pool.submit(DispatchRequest {
        job_id: job.id.clone(),
        recipient_id: recipient_id.clone(),
        message: request.into_message(),
    });

    if let Err(e) = submitted {
        // Nothing will ever pick this job up; close it out.
        if let Err(update_err) = state
            .job_repository
            .update_job_status(&job.id, JobStatus::Failed)
            .await
        {
            error!(job_id = %job.id, error = %update_err, "Failed to fail unscheduled job");
        }
        return Err(e.into());
    }

    info!(job_id = %job.id, recipient_id = %recipient_id, "Notification queued");
    Ok((StatusCode::ACCEPTED, Json(NotifyAcceptedResponse::from(&job))))
}
