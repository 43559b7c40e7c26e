//! # Resource Sample Library
//!
//! Sample resource types built on `with-resources`, exposed for the demo
//! binary and for integration testing.

pub mod clients;
pub mod getters;
pub mod lifecycle;
pub mod managers;
pub mod model;
