//! API route modules.
//!
//! Organizes routes by resource type.

pub mod health;
pub mod jobs;
pub mod logging;
pub mod notify;
pub mod stats;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/notify", notify::router())
        .nest("/jobs", jobs::router())
        .nest("/api/logging", logging::router())
        .nest("/api/stats", stats::router())
        .nest("/health", health::router())
        .with_state(state)
}
