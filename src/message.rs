//! # Store Messages
//!
//! The mailbox vocabulary between [`StoreClient`](crate::client::StoreClient)
//! and [`StoreActor`](crate::store::StoreActor).

use crate::action::Action;
use crate::error::StoreError;
use crate::state::GlobalState;
use std::sync::Arc;
use tokio::sync::oneshot;

/// One-shot response channel used by the store.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

#[derive(Debug)]
pub enum StoreRequest {
    /// Apply an action. `respond_to` is acknowledged once the action and
    /// every follow-up it emitted synchronously have been processed; results
    /// of spawned fetches are dispatched without one.
    Dispatch {
        action: Action,
        respond_to: Option<Response<()>>,
    },
    GetState {
        respond_to: Response<Arc<GlobalState>>,
    },
}
