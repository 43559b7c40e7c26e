//! # Reducer
//!
//! Pure state transitions of a resource slice, plus [`RootReducer`], which
//! combines every resource type's reducer into one function over
//! [`GlobalState`].
//!
//! Per operation the lifecycle is `idle → loading → success | failure`, and
//! `RESET` takes it back to idle. Transitions that change nothing return the
//! input `Arc` untouched.

use crate::action::{Action, ResourceAction, ResourceType};
use crate::duck::ResourceDuck;
use crate::state::{GlobalState, OperationMeta, OperationState, OperationStatus, ResourceState};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies one action to a resource slice.
pub fn reduce(
    state: &Arc<ResourceState>,
    action: &ResourceAction,
    now: DateTime<Utc>,
) -> Arc<ResourceState> {
    match action {
        ResourceAction::Register { cargo, .. } => {
            let mut next = ResourceState::clone(state);
            let entry = next.entry(&cargo.method, cargo.input_hash());
            // A mounted entry keeps its status; in-flight fetches stay visible.
            if entry.meta.render_count == 0 {
                entry.input = cargo.input.clone();
                entry.status = OperationStatus::default();
            }
            entry.meta.render_count += 1;
            Arc::new(next)
        }
        ResourceAction::Deregister { cargo, .. } => {
            let mut next = ResourceState::clone(state);
            let entry = next.entry(&cargo.method, cargo.input_hash());
            let before = entry.meta.render_count;
            entry.meta.render_count = before.saturating_sub(1);
            entry.meta.hot = before > 1;
            Arc::new(next)
        }
        ResourceAction::Ajax(payload) => {
            let cargo = &payload.cargo;
            let mut next = ResourceState::clone(state);
            let generation = next.allocate_generation();
            let entry = next.entry(&cargo.method, cargo.input_hash());
            entry.status = OperationStatus::loading();
            entry.meta.generation = Some(generation);
            Arc::new(next)
        }
        ResourceAction::AjaxSuccess {
            cargo,
            data,
            generation,
            ..
        } => {
            if is_stale(state, cargo, *generation) {
                return Arc::clone(state);
            }
            let mut next = ResourceState::clone(state);
            let entry = next.entry(&cargo.method, cargo.input_hash());
            entry.status = OperationStatus::succeeded();
            entry.data = data.get(&cargo.method).cloned();
            entry.meta.hot = true;
            entry.meta.last_ajax_success = Some(now);
            Arc::new(next)
        }
        ResourceAction::AjaxFailure {
            cargo,
            error,
            generation,
            ..
        } => {
            if is_stale(state, cargo, *generation) {
                return Arc::clone(state);
            }
            let mut next = ResourceState::clone(state);
            let entry = next.entry(&cargo.method, cargo.input_hash());
            entry.status = OperationStatus::failed(error.to_string());
            Arc::new(next)
        }
        ResourceAction::Reset { cargo } => {
            let mut next = ResourceState::clone(state);
            next.replace(
                &cargo.method,
                cargo.input_hash(),
                OperationState {
                    input: cargo.input.clone(),
                    status: OperationStatus::default(),
                    meta: OperationMeta {
                        last_reset: Some(now),
                        ..OperationMeta::default()
                    },
                    data: None,
                },
            );
            Arc::new(next)
        }
        ResourceAction::ClearCache { .. } => Arc::clone(state),
    }
}

/// Why a fetch result was left out of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discarded {
    /// A newer `Ajax` for the same operation is the one the entry tracks.
    Superseded,
    /// The entry was reset (or never existed) since the `Ajax`.
    Reset,
}

/// Decides whether a result of the `Ajax` with `generation` still belongs to
/// its entry. Results without a generation always apply.
pub fn discarded(
    state: &ResourceState,
    cargo: &crate::action::Cargo,
    generation: Option<u64>,
) -> Option<Discarded> {
    let generation = generation?;
    let current = state
        .get_operation(&cargo.method, &cargo.input_hash())
        .and_then(|op| op.meta.generation);
    match current {
        Some(current) if current == generation => None,
        Some(current) if current > generation => Some(Discarded::Superseded),
        _ => Some(Discarded::Reset),
    }
}

fn is_stale(state: &ResourceState, cargo: &crate::action::Cargo, generation: Option<u64>) -> bool {
    let reason = discarded(state, cargo, generation);
    if let Some(reason) = reason {
        debug!(method = %cargo.method, ?generation, ?reason, "Discarding stale result");
    }
    reason.is_some()
}

/// Routes each [`Action`] to the reducer of its resource type.
#[derive(Clone)]
pub struct RootReducer {
    ducks: Arc<BTreeMap<ResourceType, Arc<ResourceDuck>>>,
}

impl RootReducer {
    pub fn new(ducks: Arc<BTreeMap<ResourceType, Arc<ResourceDuck>>>) -> Self {
        Self { ducks }
    }

    /// A state with one empty slice per resource type.
    pub fn initial_state(&self) -> GlobalState {
        self.ducks
            .keys()
            .fold(GlobalState::default(), |state, resource_type| {
                state.with_resource(resource_type.clone(), Arc::default())
            })
    }

    pub fn reduce(&self, state: &GlobalState, action: &Action) -> GlobalState {
        let Some(duck) = self.ducks.get(&action.resource_type) else {
            warn!(resource_type = %action.resource_type, kind = action.action.kind(), "Unknown resource type");
            return state.clone();
        };
        let slice = state
            .resource(&action.resource_type)
            .cloned()
            .unwrap_or_default();
        let next = duck.reduce(&slice, &action.action);
        if Arc::ptr_eq(&slice, &next) && state.resource(&action.resource_type).is_some() {
            return state.clone();
        }
        state.with_resource(action.resource_type.clone(), next)
    }
}
