//! Repository layer for job and recipient storage.
//!
//! This module implements the Repository Pattern to abstract all storage
//! interactions, so a real backing store can replace the in-memory maps
//! without touching the dispatcher.

pub mod job;
pub mod recipient;

pub use job::*;
pub use recipient::*;
