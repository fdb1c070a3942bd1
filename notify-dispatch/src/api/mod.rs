//! REST API server module.
//!
//! Provides HTTP endpoints for queueing notifications, polling job status,
//! dispatch statistics, runtime log control, and health checks.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
