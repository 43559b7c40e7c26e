//! # Registry
//!
//! Tracks who observes which operation. Every [`Registry::subscribe`]
//! dispatches one `Register` and hands out a [`SubscriptionToken`]; giving the
//! token back through [`Registry::unsubscribe`] dispatches the matching
//! `Deregister`, exactly once. The reducer counts observers per operation and
//! the register/deregister epics fetch on the first one and optionally reset
//! after the last one.

use crate::action::{Action, ActionCreators, Cargo, RegisterOptions, ResourceType};
use crate::client::StoreClient;
use crate::error::StoreError;
use crate::hash::InputHash;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// A methodful operation of a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub resource_type: ResourceType,
    pub cargo: Cargo,
}

impl Operation {
    pub fn new(resource_type: impl Into<ResourceType>, method: impl Into<String>, input: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            cargo: Cargo::new(method, input),
        }
    }

    pub fn key(&self) -> OperationKey {
        OperationKey {
            resource_type: self.resource_type.clone(),
            method: self.cargo.method.clone(),
            input_hash: self.cargo.input_hash(),
        }
    }
}

/// Identity of an operation: two operations are the same when their keys
/// are equal, whatever their input's key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey {
    pub resource_type: ResourceType,
    pub method: String,
    pub input_hash: InputHash,
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.resource_type, self.method, self.input_hash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

pub struct Registry {
    store: StoreClient,
    next_token: u64,
    active: HashMap<SubscriptionToken, (Operation, RegisterOptions)>,
}

impl Registry {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            next_token: 0,
            active: HashMap::new(),
        }
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    pub async fn subscribe(
        &mut self,
        operation: Operation,
        options: RegisterOptions,
    ) -> Result<SubscriptionToken, StoreError> {
        let creators = ActionCreators::new(operation.resource_type.clone());
        self.store
            .dispatch(creators.register(operation.cargo.clone(), options))
            .await?;

        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        debug!(operation = %operation.key(), ?token, "Subscribed");
        self.active.insert(token, (operation, options));
        Ok(token)
    }

    /// Returns `false` for a token that is unknown or already given back.
    pub async fn unsubscribe(&mut self, token: SubscriptionToken) -> Result<bool, StoreError> {
        let Some((operation, options)) = self.active.remove(&token) else {
            return Ok(false);
        };
        debug!(operation = %operation.key(), ?token, "Unsubscribed");
        let creators = ActionCreators::new(operation.resource_type);
        self.store
            .dispatch(creators.deregister(operation.cargo, options))
            .await?;
        Ok(true)
    }

    pub fn operation(&self, token: SubscriptionToken) -> Option<&Operation> {
        self.active.get(&token).map(|(operation, _)| operation)
    }

    pub fn active(&self) -> usize {
        self.active.len()
    }

    /// Forgets every subscription and returns the `Deregister` actions that
    /// settle them, for a caller that cannot await.
    pub fn drain(&mut self) -> Vec<Action> {
        let mut active: Vec<_> = self.active.drain().collect();
        active.sort_by_key(|(token, _)| *token);
        active
            .into_iter()
            .map(|(_, (operation, options))| {
                ActionCreators::new(operation.resource_type).deregister(operation.cargo, options)
            })
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("next_token", &self.next_token)
            .field("active", &self.active.len())
            .finish()
    }
}
