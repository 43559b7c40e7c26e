//! # Mocks & Testing Guide
//!
//! Two seams can be faked without touching the engine:
//!
//! | Seam | Mock | Use it to |
//! |------|------|-----------|
//! | **Data manager** | [`MockDataManager`] | script fetch results, delays and failures, count calls |
//! | **Store** | [`create_mock_store`] | assert which actions a binding or client dispatches |
//!
//! ## Testing Strategies
//!
//! <details>
//! <summary><b>Pattern 0: Dispatch Assertions (Mock Store)</b></summary>
//!
//! **When to use**: Testing code that *dispatches* (a registry, a binding, a
//! typed client) without running reducers or epics.
//!
//! ```rust
//! use serde_json::json;
//! use with_resources::mock::{create_mock_store, expect_dispatch};
//! use with_resources::{Operation, RegisterOptions, Registry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (store, mut requests) = create_mock_store(8);
//!     let mut registry = Registry::new(store);
//!
//!     let subscribe = registry.subscribe(
//!         Operation::new("users", "list", json!({ "page": 1 })),
//!         RegisterOptions::default(),
//!     );
//!     let (token, action) = tokio::join!(subscribe, expect_dispatch(&mut requests));
//!     assert!(token.is_ok());
//!     assert_eq!(action.unwrap().action.kind(), "REGISTER");
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 1: Real Store, Scripted Backend (Sweet Spot)</b></summary>
//!
//! **When to use**: Testing state transitions end to end while controlling
//! exactly what the backend answers.
//!
//! ```rust
//! use serde_json::json;
//! use with_resources::mock::MockDataManager;
//! use with_resources::{configure, Cargo, ResourcesConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let animals = MockDataManager::new();
//!     animals.expect_fetch("retrieveOne").return_ok(json!({ "image": "fox.png" }));
//!
//!     let resources = configure(
//!         ResourcesConfig::new()
//!             .resource_type("ANIMALS", "animals")
//!             .data_manager("animals", animals.clone()),
//!     )
//!     .unwrap();
//!     let (store, client) = resources.start();
//!     tokio::spawn(store.run());
//!
//!     let creators = resources.action_creators_of(&"animals".into()).unwrap();
//!     let fox = Cargo::new("retrieveOne", json!({ "kind": "fox" }));
//!     client.dispatch(creators.ajax(fox)).await.unwrap();
//!     client
//!         .wait_for(|s| s.get_operation(&"animals".into(), "retrieveOne", &json!({ "kind": "fox" }))
//!             .is_some_and(|op| op.status.is_settled()))
//!         .await
//!         .unwrap();
//!     animals.verify();
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 2: Full System</b></summary>
//!
//! See `crates/resource-sample/tests/integration_test.rs` for bindings,
//! caching and reset flows against the sample data managers.
//! </details>

use crate::action::{Action, Cargo};
use crate::client::StoreClient;
use crate::data_manager::DataManager;
use crate::error::{FetchError, StoreError};
use crate::message::{Response, StoreRequest};
use crate::state::GlobalState;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

// =============================================================================
// MOCK DATA MANAGER
// =============================================================================

struct FetchExpectation {
    method: String,
    delay: Option<Duration>,
    response: Result<Value, FetchError>,
}

/// A [`DataManager`] answering from a queue of expectations.
///
/// Clones share the queue, so one clone can be handed to
/// [`configure`](crate::setup::configure) while the test keeps another for
/// `calls()` and `verify()`.
#[derive(Clone, Default)]
pub struct MockDataManager {
    expectations: Arc<Mutex<VecDeque<FetchExpectation>>>,
    unexpected: Arc<Mutex<Vec<Cargo>>>,
    calls: Arc<AtomicUsize>,
}

impl MockDataManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the next fetch to be for `method`.
    pub fn expect_fetch(&self, method: impl Into<String>) -> FetchExpectationBuilder {
        FetchExpectationBuilder {
            method: method.into(),
            delay: None,
            expectations: Arc::clone(&self.expectations),
        }
    }

    /// Number of fetches that reached the data manager.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Panics if an expectation is left over or a fetch was not expected.
    pub fn verify(&self) {
        let unexpected = self.unexpected.lock();
        if !unexpected.is_empty() {
            panic!("Unexpected fetches: {:?}", *unexpected);
        }
        let remaining = self.expectations.lock().len();
        if remaining > 0 {
            panic!("Not all expectations were met. {remaining} remaining");
        }
    }
}

#[async_trait]
impl DataManager for MockDataManager {
    async fn fetch(&self, cargo: &Cargo) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let expectation = self.expectations.lock().pop_front();

        match expectation {
            Some(expectation) if expectation.method == cargo.method => {
                if let Some(delay) = expectation.delay {
                    tokio::time::sleep(delay).await;
                }
                expectation.response.map(|result| {
                    let mut keyed = Map::new();
                    keyed.insert(cargo.method.clone(), result);
                    Value::Object(keyed)
                })
            }
            Some(expectation) => {
                self.unexpected.lock().push(cargo.clone());
                Err(FetchError::failed(format!(
                    "Expected fetch of {}, got {}",
                    expectation.method, cargo.method
                )))
            }
            None => {
                self.unexpected.lock().push(cargo.clone());
                Err(FetchError::failed(format!("Unexpected fetch of {}", cargo.method)))
            }
        }
    }
}

/// Builder for fetch expectations.
pub struct FetchExpectationBuilder {
    method: String,
    delay: Option<Duration>,
    expectations: Arc<Mutex<VecDeque<FetchExpectation>>>,
}

impl FetchExpectationBuilder {
    /// Holds the response back for `delay`.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Resolves with `result`, wrapped under the method name.
    pub fn return_ok(self, result: Value) {
        self.push(Ok(result));
    }

    pub fn return_err(self, error: FetchError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Value, FetchError>) {
        self.expectations.lock().push_back(FetchExpectation {
            method: self.method,
            delay: self.delay,
            response,
        });
    }
}

// =============================================================================
// MOCK STORE
// =============================================================================

/// Creates a store client whose requests land in the returned receiver.
///
/// The published state stays at an empty [`GlobalState`].
pub fn create_mock_store(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let (_publisher, state) = watch::channel(Arc::new(GlobalState::default()));
    (StoreClient::new(sender, state), receiver)
}

/// Waits for the next request, which must be a dispatch, acknowledges it
/// and returns its action. `None` once every client is gone.
pub async fn expect_dispatch(receiver: &mut mpsc::Receiver<StoreRequest>) -> Option<Action> {
    let (action, respond_to) = expect_dispatch_unacked(receiver).await?;
    if let Some(respond_to) = respond_to {
        let _ = respond_to.send(Ok(()));
    }
    Some(action)
}

/// Like [`expect_dispatch`] but leaves the acknowledgement to the caller,
/// e.g. to answer with a [`StoreError`].
pub async fn expect_dispatch_unacked(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Action, Option<Response<()>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Dispatch { action, respond_to }) => Some((action, respond_to)),
        _ => None,
    }
}

/// Acknowledges every dispatch until all clients are gone, then returns the
/// actions in arrival order. `get_state` requests are answered with an
/// empty state.
pub fn record_dispatches(mut receiver: mpsc::Receiver<StoreRequest>) -> JoinHandle<Vec<Action>> {
    tokio::spawn(async move {
        let mut actions = Vec::new();
        while let Some(request) = receiver.recv().await {
            match request {
                StoreRequest::Dispatch { action, respond_to } => {
                    actions.push(action);
                    if let Some(respond_to) = respond_to {
                        let _ = respond_to.send(Ok(()));
                    }
                }
                StoreRequest::GetState { respond_to } => {
                    let _ = respond_to.send(Ok(Arc::new(GlobalState::default())));
                }
            }
        }
        actions
    })
}

/// Answers the next dispatch with `error` instead of acknowledging it.
pub async fn fail_next_dispatch(
    receiver: &mut mpsc::Receiver<StoreRequest>,
    error: StoreError,
) -> Option<Action> {
    let (action, respond_to) = expect_dispatch_unacked(receiver).await?;
    if let Some(respond_to) = respond_to {
        let _ = respond_to.send(Err(error));
    }
    Some(action)
}
