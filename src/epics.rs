//! # Epics
//!
//! Epics are the side-effect half of a duck. The store shows every epic each
//! action *after* the reducer applied it, together with the post-reducer slice
//! of the action's resource type. An epic answers with at most one [`Effect`]:
//!
//! - [`Effect::Emit`]: a follow-up action, processed before the next mailbox
//!   message.
//! - [`Effect::Spawn`]: a future resolving to a follow-up action, run in its
//!   own task and dispatched back when it completes.
//!
//! Follow-up actions always address the resource type of the action that
//! caused them.

use crate::action::{Action, AjaxPayload, ResourceAction, ResourceType};
use crate::duck::ResourceDuck;
use crate::memoize::{CallOptions, SwappableMemoizer};
use crate::state::{GlobalState, ResourceState};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum Effect {
    Emit(ResourceAction),
    Spawn(BoxFuture<'static, ResourceAction>),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Emit(action) => f.debug_tuple("Emit").field(action).finish(),
            Effect::Spawn(_) => f.write_str("Spawn(..)"),
        }
    }
}

pub trait Epic: Send + Sync {
    fn name(&self) -> &'static str;

    fn react(&self, action: &ResourceAction, state: &ResourceState) -> Option<Effect>;
}

/// Fetches when an operation gains its first observer, when the observer asks
/// for a fetch on every registration, or when the last attempt failed.
#[derive(Debug, Default)]
pub struct RegisterEpic;

impl Epic for RegisterEpic {
    fn name(&self) -> &'static str {
        "register"
    }

    fn react(&self, action: &ResourceAction, state: &ResourceState) -> Option<Effect> {
        let ResourceAction::Register { cargo, options } = action else {
            return None;
        };
        if options.skip_fetch {
            return None;
        }
        let operation = state.get_operation(&cargo.method, &cargo.input_hash());
        let render_count = operation.map_or(0, |op| op.meta.render_count);
        let failed = operation.is_some_and(|op| op.status.success == Some(false));

        if options.ajax_on_hot_register || render_count == 1 || failed {
            let payload = AjaxPayload::new(cargo.clone()).use_last(options.use_last);
            return Some(Effect::Emit(ResourceAction::Ajax(payload)));
        }
        None
    }
}

/// Resets an operation once its last observer left, if asked to.
#[derive(Debug, Default)]
pub struct DeregisterEpic;

impl Epic for DeregisterEpic {
    fn name(&self) -> &'static str {
        "deregister"
    }

    fn react(&self, action: &ResourceAction, state: &ResourceState) -> Option<Effect> {
        let ResourceAction::Deregister { cargo, options } = action else {
            return None;
        };
        let render_count = state
            .get_operation(&cargo.method, &cargo.input_hash())
            .map_or(0, |op| op.meta.render_count);

        (render_count == 0 && options.reset_on_last_deregister).then(|| {
            Effect::Emit(ResourceAction::Reset {
                cargo: cargo.clone(),
            })
        })
    }
}

/// Calls the memoized data manager and turns the outcome into
/// `AjaxSuccess` / `AjaxFailure`.
pub struct AjaxEpic {
    fetch: Arc<SwappableMemoizer>,
}

impl AjaxEpic {
    pub fn new(fetch: Arc<SwappableMemoizer>) -> Self {
        Self { fetch }
    }
}

impl Epic for AjaxEpic {
    fn name(&self) -> &'static str {
        "ajax"
    }

    fn react(&self, action: &ResourceAction, state: &ResourceState) -> Option<Effect> {
        let ResourceAction::Ajax(payload) = action else {
            return None;
        };
        let input_hash = payload.cargo.input_hash();
        let generation = state
            .get_operation(&payload.cargo.method, &input_hash)
            .and_then(|op| op.meta.generation);
        let renew = !payload.options.use_last;
        info!(method = %payload.cargo.method, %input_hash, ?generation, renew, "Fetch issued");

        let pending = self.fetch.call(&payload.cargo, CallOptions { renew });
        let cargo = payload.cargo.clone();
        let on_success = payload.on_success.clone();
        let on_failure = payload.on_failure.clone();

        Some(Effect::Spawn(
            async move {
                match pending.await {
                    Ok(data) => ResourceAction::AjaxSuccess {
                        cargo,
                        data,
                        generation,
                        on_success,
                    },
                    Err(error) => {
                        warn!(method = %cargo.method, %error, "Fetch failed");
                        ResourceAction::AjaxFailure {
                            cargo,
                            error,
                            generation,
                            on_failure,
                        }
                    }
                }
            }
            .boxed(),
        ))
    }
}

/// Routes each action to the epics of its resource type.
#[derive(Clone)]
pub struct RootEpic {
    ducks: Arc<BTreeMap<ResourceType, Arc<ResourceDuck>>>,
}

impl RootEpic {
    pub fn new(ducks: Arc<BTreeMap<ResourceType, Arc<ResourceDuck>>>) -> Self {
        Self { ducks }
    }

    /// Runs every epic of `action`'s resource type against `state`, which must
    /// already include the action.
    pub fn react(&self, action: &Action, state: &GlobalState) -> Vec<Effect> {
        let (Some(duck), Some(slice)) = (
            self.ducks.get(&action.resource_type),
            state.resource(&action.resource_type),
        ) else {
            return Vec::new();
        };
        duck.epics()
            .iter()
            .filter_map(|epic| {
                let effect = epic.react(&action.action, slice)?;
                debug!(resource_type = %action.resource_type, epic = epic.name(), ?effect, "Epic fired");
                Some(effect)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Cargo, RegisterOptions};
    use crate::data_manager::MethodTable;
    use crate::error::FetchError;
    use crate::memoize::MemoizeOptions;
    use crate::reducer::reduce;
    use chrono::Utc;
    use serde_json::json;

    fn fox() -> Cargo {
        Cargo::new("retrieveOne", json!({ "kind": "fox" }))
    }

    fn register(options: RegisterOptions) -> ResourceAction {
        ResourceAction::Register {
            cargo: fox(),
            options,
        }
    }

    fn after(state: &Arc<ResourceState>, action: &ResourceAction) -> Arc<ResourceState> {
        reduce(state, action, Utc::now())
    }

    fn emits_ajax(effect: Option<Effect>) -> bool {
        matches!(effect, Some(Effect::Emit(ResourceAction::Ajax(_))))
    }

    #[test]
    fn test_register_fetches_on_first_observer_only() {
        let action = register(RegisterOptions::default());
        let once = after(&Arc::default(), &action);
        assert!(emits_ajax(RegisterEpic.react(&action, &once)));

        let twice = after(&once, &action);
        assert!(RegisterEpic.react(&action, &twice).is_none());
    }

    #[test]
    fn test_register_hot_and_failed_rules() {
        let plain = register(RegisterOptions::default());
        let hot = register(RegisterOptions {
            ajax_on_hot_register: true,
            use_last: true,
            ..RegisterOptions::default()
        });
        let state = after(&after(&Arc::default(), &plain), &hot);
        match RegisterEpic.react(&hot, &state) {
            Some(Effect::Emit(ResourceAction::Ajax(payload))) => assert!(payload.options.use_last),
            other => panic!("expected ajax, got {other:?}"),
        }

        let failed = after(
            &state,
            &ResourceAction::AjaxFailure {
                cargo: fox(),
                error: FetchError::failed("timeout"),
                generation: None,
                on_failure: None,
            },
        );
        let state = after(&failed, &plain);
        assert!(emits_ajax(RegisterEpic.react(&plain, &state)));
    }

    #[test]
    fn test_register_skip_fetch() {
        let action = register(RegisterOptions {
            skip_fetch: true,
            ..RegisterOptions::default()
        });
        let state = after(&Arc::default(), &action);
        assert!(RegisterEpic.react(&action, &state).is_none());
    }

    #[test]
    fn test_deregister_resets_after_last_observer() {
        let options = RegisterOptions {
            reset_on_last_deregister: true,
            ..RegisterOptions::default()
        };
        let deregister = ResourceAction::Deregister {
            cargo: fox(),
            options,
        };
        let state = after(&after(&Arc::default(), &register(options)), &register(options));

        let state = after(&state, &deregister);
        assert!(DeregisterEpic.react(&deregister, &state).is_none());

        let state = after(&state, &deregister);
        assert!(matches!(
            DeregisterEpic.react(&deregister, &state),
            Some(Effect::Emit(ResourceAction::Reset { .. }))
        ));
    }

    #[tokio::test]
    async fn test_ajax_resolves_to_success_with_generation() {
        let animals = MethodTable::new().method("retrieveOne", |_| async {
            Ok(json!({ "image": "fox.png" }))
        });
        let fetch = Arc::new(SwappableMemoizer::new(Arc::new(animals), MemoizeOptions::default()));
        let epic = AjaxEpic::new(fetch);
        let action = ResourceAction::Ajax(AjaxPayload::new(fox()));
        let state = after(&after(&Arc::default(), &action), &action);

        let Some(Effect::Spawn(future)) = epic.react(&action, &state) else {
            panic!("ajax epic must spawn");
        };
        match future.await {
            ResourceAction::AjaxSuccess {
                data, generation, ..
            } => {
                assert_eq!(data, json!({ "retrieveOne": { "image": "fox.png" } }));
                assert_eq!(generation, Some(1));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ajax_rejection_becomes_failure() {
        let animals = MethodTable::new().method("retrieveOne", |_| async {
            Err(FetchError::failed("timeout"))
        });
        let fetch = Arc::new(SwappableMemoizer::new(Arc::new(animals), MemoizeOptions::default()));
        let action = ResourceAction::Ajax(AjaxPayload::new(fox()));
        let state = after(&Arc::default(), &action);

        let Some(Effect::Spawn(future)) = AjaxEpic::new(fetch).react(&action, &state) else {
            panic!("ajax epic must spawn");
        };
        assert!(matches!(
            future.await,
            ResourceAction::AjaxFailure { error, generation: Some(0), .. } if error == FetchError::failed("timeout")
        ));
    }
}
