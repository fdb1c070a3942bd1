//! Domain layer for notify-dispatch.
//!
//! This module contains the core entities and value objects: recipients and
//! their typed addresses, messages, and the job state machine.

pub mod job;
pub mod message;
pub mod recipient;
pub mod value_objects;

pub use job::{Job, JobStatus};
pub use message::Message;
pub use recipient::{Address, AddressKind, Recipient};
pub use value_objects::*;
