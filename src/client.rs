//! # Store Client
//!
//! The cloneable handle to a running [`StoreActor`](crate::store::StoreActor).
//! Dispatches go through the actor's mailbox; reads come either from the
//! mailbox (`get_state`, ordered after earlier dispatches) or from the
//! published snapshot (`state`, `subscribe`, `wait_for`).

use crate::action::Action;
use crate::error::StoreError;
use crate::message::StoreRequest;
use crate::state::GlobalState;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
    state: watch::Receiver<Arc<GlobalState>>,
}

impl StoreClient {
    pub fn new(
        sender: mpsc::Sender<StoreRequest>,
        state: watch::Receiver<Arc<GlobalState>>,
    ) -> Self {
        Self { sender, state }
    }

    /// Dispatches `action` and waits until the store processed it together
    /// with every follow-up action it emitted synchronously.
    pub async fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Dispatch {
                action,
                respond_to: Some(respond_to),
            })
            .await
            .map_err(|_| StoreError::StoreClosed)?;
        response.await.map_err(|_| StoreError::StoreDropped)?
    }

    /// Dispatches `actions` in order, stopping at the first failure.
    pub async fn dispatch_all(
        &self,
        actions: impl IntoIterator<Item = Action>,
    ) -> Result<(), StoreError> {
        for action in actions {
            self.dispatch(action).await?;
        }
        Ok(())
    }

    pub async fn get_state(&self) -> Result<Arc<GlobalState>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::GetState { respond_to })
            .await
            .map_err(|_| StoreError::StoreClosed)?;
        response.await.map_err(|_| StoreError::StoreDropped)?
    }

    /// The latest published state.
    pub fn state(&self) -> Arc<GlobalState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<GlobalState>> {
        self.state.clone()
    }

    /// Waits until a published state satisfies `predicate`, starting with
    /// the current one.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&GlobalState) -> bool,
    ) -> Result<Arc<GlobalState>, StoreError> {
        let mut receiver = self.state.clone();
        let state = receiver
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| StoreError::StoreClosed)?;
        Ok(Arc::clone(&state))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
