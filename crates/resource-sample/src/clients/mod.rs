//! # Typed Clients
//!
//! Domain-specific wrappers around the store client, one per sample
//! resource type. They inherit `ajax`, `reset`, `clear_cache` and
//! `wait_settled` from [`ResourceClient`](with_resources::ResourceClient).

pub mod animal_client;
pub mod user_client;

pub use animal_client::{AnimalClient, AnimalError};
pub use user_client::{UserClient, UserError};
