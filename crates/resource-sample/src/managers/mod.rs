//! # Sample Data Managers
//!
//! In-process stand-ins for the backends of the sample resource types. Each
//! simulates a network round trip with a fixed delay.

pub mod animals;
pub mod users;

pub use animals::animals;
pub use users::users;
