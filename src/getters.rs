//! # Getters
//!
//! Read helpers over the store state for one resource type. The built-in
//! lookups work on every resource type; additional named getters can be
//! registered up front or loaded asynchronously through a [`GetterLoader`].

use crate::action::ResourceType;
use crate::error::GetterLoadError;
use crate::hash::{InputHash, InputRef};
use crate::state::{GlobalState, OperationState, OperationStatus, ResourceState};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// A named read over the whole state. The second argument carries getter
/// specific parameters (an operation input, a default value, ...).
pub type CustomGetter = Arc<dyn Fn(&GlobalState, &Value) -> Option<Value> + Send + Sync>;

pub type GetterSet = BTreeMap<String, CustomGetter>;

/// Supplies the custom getters of a resource type on demand.
#[async_trait]
pub trait GetterLoader: Send + Sync {
    async fn load(&self, resource_type: &ResourceType) -> Result<GetterSet, GetterLoadError>;
}

#[derive(Clone)]
pub struct Getters {
    resource_type: ResourceType,
    custom: Arc<RwLock<GetterSet>>,
    loaded: Arc<OnceCell<bool>>,
}

impl fmt::Debug for Getters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Getters")
            .field("resource_type", &self.resource_type)
            .field("custom", &self.names())
            .field("loaded", &self.loaded.get())
            .finish()
    }
}

impl Getters {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            custom: Arc::default(),
            loaded: Arc::default(),
        }
    }

    pub fn with_custom(self, getters: GetterSet) -> Self {
        self.custom.write().extend(getters);
        self
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn get_resource<'s>(&self, state: &'s GlobalState) -> Option<&'s Arc<ResourceState>> {
        state.resource(&self.resource_type)
    }

    pub fn get_method<'s>(
        &self,
        state: &'s GlobalState,
        method: &str,
    ) -> Option<&'s BTreeMap<InputHash, OperationState>> {
        self.get_resource(state)?.get_method(method)
    }

    /// `input` may be the operation input or its precomputed hash.
    pub fn get_operation<'s, 'i>(
        &self,
        state: &'s GlobalState,
        method: &str,
        input: impl Into<InputRef<'i>>,
    ) -> Option<&'s OperationState> {
        self.get_resource(state)?.get_operation(method, input)
    }

    pub fn get_status<'s, 'i>(
        &self,
        state: &'s GlobalState,
        method: &str,
        input: impl Into<InputRef<'i>>,
    ) -> Option<&'s OperationStatus> {
        self.get_operation(state, method, input)
            .map(|operation| &operation.status)
    }

    /// Runs the custom getter `name`. `None` when it is not registered (or
    /// not loaded yet) or has nothing to return.
    pub fn get(&self, name: &str, state: &GlobalState, args: &Value) -> Option<Value> {
        let getter = self.custom.read().get(name).cloned();
        match getter {
            Some(getter) => getter(state, args),
            None => {
                debug!(resource_type = %self.resource_type, name, "No such getter");
                None
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.custom.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.custom.read().keys().cloned().collect()
    }

    /// Loads custom getters once. Later calls return the first outcome.
    /// A failing loader is logged and reported as `false`.
    pub async fn load(&self, loader: &dyn GetterLoader) -> bool {
        *self
            .loaded
            .get_or_init(|| async {
                match loader.load(&self.resource_type).await {
                    Ok(getters) => {
                        debug!(resource_type = %self.resource_type, count = getters.len(), "Getters loaded");
                        self.custom.write().extend(getters);
                        true
                    }
                    Err(e) => {
                        warn!(resource_type = %self.resource_type, error = %e, "Failed to load getters");
                        false
                    }
                }
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().copied().unwrap_or(false)
    }
}
