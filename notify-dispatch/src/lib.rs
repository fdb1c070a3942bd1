//! notify-dispatch library crate.
//!
//! Multi-channel notification dispatch: channels, retry with backoff,
//! priority fallback across a recipient's addresses, and a pollable job
//! store, served over an axum HTTP API.

pub mod api;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod logging;
pub mod notification;

pub use error::{Error, Result};
