//! # ResourceClient Trait
//!
//! A common interface for typed, per-resource-type clients: default
//! `ajax`, `reset`, `clear_cache` and lookups built on a [`StoreClient`].
use crate::action::{ActionCreators, AjaxPayload, Cargo, ResourceType};
use crate::client::StoreClient;
use crate::error::StoreError;
use crate::state::{GlobalState, OperationState};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Trait for typed clients of one resource type.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use with_resources::{ResourceClient, ResourceType, StoreClient, StoreError};
///
/// #[derive(Debug)]
/// struct AnimalError(String);
///
/// struct AnimalClient {
///     store: StoreClient,
///     resource_type: ResourceType,
/// }
///
/// #[async_trait]
/// impl ResourceClient for AnimalClient {
///     type Error = AnimalError;
///
///     fn store(&self) -> &StoreClient {
///         &self.store
///     }
///
///     fn resource_type(&self) -> &ResourceType {
///         &self.resource_type
///     }
///
///     fn map_error(e: StoreError) -> Self::Error {
///         AnimalError(e.to_string())
///     }
/// }
///
/// async fn usage(client: AnimalClient) {
///     // ajax(), reset() and wait_settled() come for free.
///     let cargo = with_resources::Cargo::new("retrieveOne", serde_json::json!({ "kind": "fox" }));
///     let _ = client.ajax(cargo.clone()).await;
///     let _ = client.wait_settled(&cargo).await;
/// }
/// ```
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// The resource-specific error type.
    type Error: Send + Sync;

    fn store(&self) -> &StoreClient;

    fn resource_type(&self) -> &ResourceType;

    /// Map store errors to the specific resource error type.
    fn map_error(e: StoreError) -> Self::Error;

    fn action_creators(&self) -> ActionCreators {
        ActionCreators::new(self.resource_type().clone())
    }

    /// Dispatches an `Ajax` for the payload's operation.
    #[tracing::instrument(skip(self, payload))]
    async fn ajax<P>(&self, payload: P) -> Result<(), Self::Error>
    where
        P: Into<AjaxPayload> + Send + 'static,
    {
        tracing::debug!("Sending request");
        self.store()
            .dispatch(self.action_creators().ajax(payload))
            .await
            .map_err(Self::map_error)
    }

    #[tracing::instrument(skip(self))]
    async fn reset(&self, cargo: Cargo) -> Result<(), Self::Error> {
        tracing::debug!("Sending request");
        self.store()
            .dispatch(self.action_creators().reset(cargo))
            .await
            .map_err(Self::map_error)
    }

    #[tracing::instrument(skip(self))]
    async fn clear_cache(&self, timeout: Option<Duration>) -> Result<(), Self::Error> {
        tracing::debug!("Sending request");
        self.store()
            .dispatch(self.action_creators().clear_cache(timeout))
            .await
            .map_err(Self::map_error)
    }

    /// The operation's entry in the latest published state.
    fn operation(&self, method: &str, input: &Value) -> Option<OperationState> {
        self.store()
            .state()
            .get_operation(self.resource_type(), method, input)
            .cloned()
    }

    /// Waits until the operation has either succeeded or failed.
    #[tracing::instrument(skip(self))]
    async fn wait_settled(&self, cargo: &Cargo) -> Result<OperationState, Self::Error> {
        let resource_type = self.resource_type().clone();
        let settled = |state: &GlobalState| {
            state
                .get_operation(&resource_type, &cargo.method, &cargo.input)
                .filter(|operation| operation.status.is_settled())
                .cloned()
        };
        let state = self
            .store()
            .wait_for(|state| settled(state).is_some())
            .await
            .map_err(Self::map_error)?;
        settled(&state).ok_or_else(|| Self::map_error(StoreError::StoreClosed))
    }
}
