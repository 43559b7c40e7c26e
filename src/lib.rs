#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # With Resources
//!
//! > **Declarative data fetching bound to a central store.**
//!
//! A view declares the operations it needs, `{resource type, method, input}`,
//! and the engine does the rest: it fetches through a memoized data manager,
//! records loading/success/error per operation in one state tree, counts who
//! is watching each operation and resets what nobody watches anymore.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why a Store Actor?
//!
//! All state lives in a single [`StoreActor`]. Actions arrive through its
//! mailbox and are applied one at a time, so reducers are plain functions
//! over immutable snapshots and nothing needs a lock:
//! - **Ordering**: actions are applied strictly in arrival order.
//! - **Cheap change detection**: untouched resource slices keep their `Arc`
//!   identity, so observers compare pointers instead of data.
//! - **Isolation**: fetches run in their own tasks and report back as
//!   ordinary actions.
//!
//! ## 🚀 Core Concepts
//!
//! ### Ducks
//! Each resource type gets a [`ResourceDuck`](duck::ResourceDuck): action
//! creators, a reducer, the register/deregister/ajax epics and getters,
//! sharing one [`Memoizer`](memoize::Memoizer) around the user's
//! [`DataManager`].
//!
//! ### Operations and Render Counts
//! `REGISTER` and `DEREGISTER` count observers per operation. The first
//! observer triggers a fetch; with `reset_on_last_deregister` the last one
//! leaving clears the entry.
//!
//! ### Mocking: Testing without Pain
//! [`MockDataManager`](mock::MockDataManager) scripts backend answers and
//! [`create_mock_store`](mock::create_mock_store) captures dispatches.
//! See the [`mock`] module for a complete guide.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Stale Results
//! Every `AJAX` takes a generation number from its resource slice. Results
//! carrying an older generation than the entry's latest are dropped, so a
//! late answer can never overwrite a `RESET` or a newer request.
//!
//! ### 2. Callbacks After Commit
//! `on_success` / `on_failure` run in their own task once the result has been
//! committed and published. A result superseded by a newer request still
//! calls back without touching state; a result wiped by `RESET` stays silent.
//!
//! ### 3. Observability
//! `tracing` everywhere with structured fields (`resource_type`, `method`,
//! `input_hash`). See the [`tracing`](crate::tracing) module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Core ([`hash`], [`memoize`], [`reducer`], [`epics`])
//! Pure building blocks: stable input hashing, the request memoizer, the
//! per-resource reducer and the epics that turn intents into fetches.
//!
//! ### 2. The Store ([`store`], [`client`], [`setup`])
//! - **Role**: Composes every duck into one reducer and one epic pipeline and runs them.
//! - **Key items**: [`configure`], [`Resources`], [`StoreActor`], [`StoreClient`].
//!
//! ### 3. The Interface ([`registry`], [`binding`], [`getters`], [`resource_client`])
//! - **Role**: What views and services touch: subscribing to operations,
//!   deriving combined status, reading state.
//! - **Key items**: [`ResourceBinding`], [`Getters`], [`ResourceClient`].
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use with_resources::{configure, MethodTable, OperationDescriptor, ResourcesConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let animals = MethodTable::new().method("retrieveOne", |input| async move {
//!         Ok(json!({ "image": format!("{}.png", input["kind"].as_str().unwrap_or("cat")) }))
//!     });
//!     let resources = configure(
//!         ResourcesConfig::new()
//!             .resource_type("ANIMALS", "animals")
//!             .data_manager("animals", animals),
//!     )
//!     .unwrap();
//!     let (store, client) = resources.start();
//!     tokio::spawn(store.run());
//!
//!     let fox = OperationDescriptor::new("animals", "retrieveOne", json!({ "kind": "fox" })).autorun();
//!     let mut binding = resources.binding(client, vec![fox]);
//!     binding.mount().await.unwrap();
//!     while binding.status().loading != Some(false) {
//!         binding.changed().await.unwrap();
//!     }
//!     assert_eq!(binding.status().success, Some(true));
//!     binding.unmount().await.unwrap();
//! }
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run -p resource-sample
//! ```

pub mod action;
pub mod binding;
pub mod client;
pub mod config;
pub mod data_manager;
pub mod duck;
pub mod epics;
pub mod error;
pub mod getters;
pub mod hash;
pub mod memoize;
pub mod message;
pub mod mock;
pub mod reducer;
pub mod registry;
pub mod resource_client;
pub mod setup;
pub mod state;
pub mod store;
pub mod tracing;

pub use action::{
    Action, ActionCreators, AjaxFailed, AjaxOptions, AjaxPayload, AjaxSucceeded, Cargo,
    RegisterOptions, ResourceAction, ResourceType,
};
pub use binding::{combined_status, CombinedStatus, DerivedState, OperationDescriptor, OperationOptions, ResourceBinding};
pub use client::StoreClient;
pub use config::Settings;
pub use data_manager::{DataManager, MethodTable};
pub use error::{FetchError, GetterLoadError, SetupError, SettingsError, StoreError};
pub use getters::{CustomGetter, GetterLoader, GetterSet, Getters};
pub use hash::{hash, InputHash};
pub use registry::{Operation, OperationKey, Registry, SubscriptionToken};
pub use resource_client::ResourceClient;
pub use setup::{configure, Resources, ResourcesConfig};
pub use state::{GlobalState, OperationState, OperationStatus, ResourceState};
pub use store::StoreActor;
