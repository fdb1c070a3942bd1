//! Notification dispatch module.
//!
//! Delivers a message to a recipient through email, SMS or chat, retrying
//! each channel and falling back to the next one in priority order.
//!
//! # Features
//!
//! - One channel per address kind behind the [`NotificationChannel`] trait
//! - Pluggable transports (simulated provider by default)
//! - Bounded retry with exponential backoff and jitter
//! - First-success-wins fallback across channels
//! - Background worker pool for fire-and-forget dispatch
//!
//! # Example
//!
//! ```ignore
//! use notify_dispatch::notification::{NotificationService, NotificationServiceConfig};
//!
//! let service = NotificationService::with_config(&config, recipients, jobs);
//! let delivered = service.dispatch("user_1", &message, Some(&job.id)).await;
//! ```

pub mod channels;
pub mod retry;
pub mod service;
pub mod transport;
pub mod worker;

pub use channels::{
    ChannelSet, ChannelsConfig, ChatConfig, EmailConfig, NotificationChannel, SmsConfig,
};
pub use retry::{RetryOutcome, deliver_with_retry, send_with_retry};
pub use service::{NotificationService, NotificationServiceConfig, NotificationStats};
pub use transport::{Envelope, SimulatedTransport, SimulationConfig, Transport};
pub use worker::{DispatchRequest, DispatchWorkerConfig, DispatchWorkerPool};
