//! Job status routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::api::error::ApiResult;
use crate::api::models::JobStatusResponse;
use crate::api::server::AppState;

/// Create the jobs router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{job_id}", get(get_job))
}

/// Get the current status of a job.
async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state.job_repository.get_job(&job_id).await?;
    Ok(Json(job.into()))
}
