//! # Store Actor
//!
//! The store is a single actor owning the [`GlobalState`]. Every mutation goes
//! through its mailbox, so actions are applied strictly in arrival order and
//! the reducer never needs a lock.
//!
//! For each action the store:
//!
//! 1. runs the [`RootReducer`] and publishes the new state if a slice changed;
//! 2. hands fetch results to their callbacks, unless a `RESET` wiped the
//!    entry since the fetch started;
//! 3. runs the [`RootEpic`]. Emitted actions are queued and processed before
//!    the next mailbox message; spawned futures run in their own tasks and
//!    come back through the mailbox as ordinary dispatches.
//!
//! Spawned tasks only hold a weak sender, so dropping the last
//! [`StoreClient`] shuts the store down even with fetches in flight.

use crate::action::{Action, AjaxFailed, AjaxSucceeded, Cargo, ResourceAction, ResourceType};
use crate::client::StoreClient;
use crate::epics::{Effect, RootEpic};
use crate::message::StoreRequest;
use crate::reducer::{discarded, Discarded, RootReducer};
use crate::state::{GlobalState, ResourceState};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    sender: mpsc::WeakSender<StoreRequest>,
    reducer: RootReducer,
    epics: RootEpic,
    state: Arc<GlobalState>,
    publisher: watch::Sender<Arc<GlobalState>>,
}

impl StoreActor {
    /// Creates the store and its client. `buffer_size` bounds the mailbox;
    /// dispatches wait while it is full.
    pub fn new(buffer_size: usize, reducer: RootReducer, epics: RootEpic) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let state = Arc::new(reducer.initial_state());
        let (publisher, subscriber) = watch::channel(Arc::clone(&state));
        let actor = Self {
            receiver,
            sender: sender.downgrade(),
            reducer,
            epics,
            state,
            publisher,
        };
        (actor, StoreClient::new(sender, subscriber))
    }

    pub async fn run(mut self) {
        let resource_types = self.state.resource_types().count();
        info!(resource_types, "Store started");
        let mut dispatched: u64 = 0;

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Dispatch { action, respond_to } => {
                    dispatched += self.process(action);
                    if let Some(respond_to) = respond_to {
                        let _ = respond_to.send(Ok(()));
                    }
                }
                StoreRequest::GetState { respond_to } => {
                    let _ = respond_to.send(Ok(Arc::clone(&self.state)));
                }
            }
        }

        info!(dispatched, "Shutdown");
    }

    /// Applies `action` and its synchronous follow-ups. Returns how many
    /// actions were applied.
    fn process(&mut self, action: Action) -> u64 {
        let mut queue = VecDeque::from([action]);
        let mut applied = 0;

        while let Some(action) = queue.pop_front() {
            applied += 1;
            let resource_type = &action.resource_type;
            debug!(%resource_type, kind = action.action.kind(), "Dispatch");

            let next = self.reducer.reduce(&self.state, &action);
            let changed = self.state.slice_changed(&next, resource_type);
            if changed {
                self.state = Arc::new(next);
                self.publisher.send_replace(Arc::clone(&self.state));
            }
            let slice = self.state.resource(resource_type).map(Arc::as_ref);
            notify(&action.action, changed, slice);

            for effect in self.epics.react(&action, &self.state) {
                match effect {
                    Effect::Emit(follow_up) => {
                        queue.push_back(Action::new(resource_type.clone(), follow_up))
                    }
                    Effect::Spawn(future) => self.spawn(resource_type.clone(), future),
                }
            }
        }
        applied
    }

    fn spawn(&self, resource_type: ResourceType, future: BoxFuture<'static, ResourceAction>) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let action = Action::new(resource_type, future.await);
            let Some(sender) = sender.upgrade() else {
                debug!(kind = action.action.kind(), "Store gone, result dropped");
                return;
            };
            let kind = action.action.kind();
            let request = StoreRequest::Dispatch {
                action,
                respond_to: None,
            };
            if sender.send(request).await.is_err() {
                debug!(kind, "Store gone, result dropped");
            }
        });
    }
}

/// Runs the callback attached to a fetch result. A committed result is
/// already part of the published state. A result superseded by a newer
/// `Ajax` still reaches its callback; one wiped by a `Reset` does not.
fn notify(action: &ResourceAction, committed: bool, slice: Option<&ResourceState>) {
    let silenced = |cargo: &Cargo, generation: Option<u64>| {
        !committed
            && slice.map_or(true, |slice| {
                discarded(slice, cargo, generation) != Some(Discarded::Superseded)
            })
    };
    match action {
        ResourceAction::AjaxSuccess {
            cargo,
            data,
            generation,
            on_success: Some(callback),
        } => {
            if silenced(cargo, *generation) {
                debug!(method = %cargo.method, "Reset result, callback skipped");
                return;
            }
            let callback = callback.clone();
            let event = AjaxSucceeded {
                cargo: cargo.clone(),
                data: data.clone(),
            };
            tokio::spawn(async move { callback.call(event) });
        }
        ResourceAction::AjaxFailure {
            cargo,
            error,
            generation,
            on_failure: Some(callback),
        } => {
            if silenced(cargo, *generation) {
                debug!(method = %cargo.method, "Reset result, callback skipped");
                return;
            }
            let callback = callback.clone();
            let event = AjaxFailed {
                cargo: cargo.clone(),
                error: error.clone(),
            };
            tokio::spawn(async move { callback.call(event) });
        }
        _ => {}
    }
}
