//! Dispatch statistics route.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::error::ApiResult;
use crate::api::models::StatsResponse;
use crate::api::server::AppState;
use crate::domain::JobStatus;

/// Create the stats router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_stats))
}

async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let jobs = &state.job_repository;
    Ok(Json(StatsResponse {
        dispatch: state.notification_service.stats(),
        pending_jobs: jobs.count_by_status(JobStatus::Pending).await?,
        succeeded_jobs: jobs.count_by_status(JobStatus::Success).await?,
        failed_jobs: jobs.count_by_status(JobStatus::Failed).await?,
        active_dispatches: state.worker_pool.active_dispatches(),
        queued_dispatches: state.worker_pool.queued(),
    }))
}
