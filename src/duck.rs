//! # Resource Duck
//!
//! Everything the engine knows about one resource type, bundled: its action
//! creators, its reducer, its epics, its getters and the memoized data
//! manager the epics fetch through.

use crate::action::{ActionCreators, ResourceAction, ResourceType};
use crate::data_manager::DataManager;
use crate::epics::{AjaxEpic, DeregisterEpic, Epic, RegisterEpic};
use crate::getters::Getters;
use crate::memoize::{MemoizeOptions, SwappableMemoizer};
use crate::reducer;
use crate::state::ResourceState;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub struct ResourceDuck {
    resource_type: ResourceType,
    action_creators: ActionCreators,
    fetch: Arc<SwappableMemoizer>,
    epics: Vec<Arc<dyn Epic>>,
    getters: Getters,
    default_timeout: Option<Duration>,
}

impl fmt::Debug for ResourceDuck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let epics: Vec<&str> = self.epics.iter().map(|epic| epic.name()).collect();
        f.debug_struct("ResourceDuck")
            .field("resource_type", &self.resource_type)
            .field("epics", &epics)
            .field("getters", &self.getters)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl ResourceDuck {
    pub fn new(
        resource_type: ResourceType,
        data_manager: Arc<dyn DataManager>,
        options: MemoizeOptions,
    ) -> Self {
        let default_timeout = options.timeout;
        let fetch = Arc::new(SwappableMemoizer::new(data_manager, options));
        let epics: Vec<Arc<dyn Epic>> = vec![
            Arc::new(RegisterEpic),
            Arc::new(DeregisterEpic),
            Arc::new(AjaxEpic::new(Arc::clone(&fetch))),
        ];
        Self {
            action_creators: ActionCreators::new(resource_type.clone()),
            getters: Getters::new(resource_type.clone()),
            resource_type,
            fetch,
            epics,
            default_timeout,
        }
    }

    pub fn with_getters(mut self, getters: Getters) -> Self {
        self.getters = getters;
        self
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn action_creators(&self) -> &ActionCreators {
        &self.action_creators
    }

    pub fn getters(&self) -> &Getters {
        &self.getters
    }

    pub fn epics(&self) -> &[Arc<dyn Epic>] {
        &self.epics
    }

    pub fn fetch(&self) -> &SwappableMemoizer {
        &self.fetch
    }

    /// The duck's reducer. `ClearCache` also swaps the memoizer, falling back
    /// to the configured timeout when the action carries none.
    pub fn reduce(&self, state: &Arc<ResourceState>, action: &ResourceAction) -> Arc<ResourceState> {
        if let ResourceAction::ClearCache { timeout } = action {
            self.fetch.clear(timeout.or(self.default_timeout));
        }
        reducer::reduce(state, action, Utc::now())
    }
}
