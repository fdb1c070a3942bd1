//! Storage module for notify-dispatch.
//!
//! Jobs and recipients live behind repository traits so the dispatcher never
//! depends on a concrete store. The bundled implementations keep everything
//! in concurrent in-memory maps.

pub mod repositories;

pub use repositories::{
    InMemoryJobRepository, InMemoryRecipientRepository, JobRepository, RecipientRepository,
};
