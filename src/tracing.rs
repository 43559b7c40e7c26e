//! # Observability & Tracing
//!
//! The engine logs through `tracing` with structured fields; nothing is
//! printed unless the application installs a subscriber. [`setup_tracing`]
//! installs the usual one.
//!
//! ## What Gets Traced
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | store started / shutdown, fetch issued, cache cleared |
//! | `debug` | every dispatched action, epics firing, cache hits and misses, stale results |
//! | `warn` | fetch failures, unknown resource types, getter loading failures |
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle and fetches
//! RUST_LOG=info cargo run -p resource-sample
//!
//! # Every action and cache decision
//! RUST_LOG=with_resources=debug cargo run -p resource-sample
//! ```
//!
//! With `RUST_LOG=debug` a first fetch reads like:
//!
//! ```text
//! DEBUG Dispatch resource_type=animals kind="REGISTER"
//! DEBUG Epic fired resource_type=animals epic="register" effect=Emit(Ajax(..))
//! DEBUG Dispatch resource_type=animals kind="AJAX"
//!  INFO Fetch issued method=retrieveOne input_hash=5e1b0f2a77c3 generation=Some(0) renew=true
//! DEBUG Cache miss method=retrieveOne key=9f01c6d2b4aa renew=true
//! DEBUG Dispatch resource_type=animals kind="AJAX_SUCCESS"
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Panics if a global subscriber is already set; call it once from `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
