//! # Animal Client
//!
//! Retrieves pictures through the store, so every caller shares the
//! memoized fetch and the state entry of a kind.
use crate::model::{queries_input, ANIMALS, RETRIEVE_ONE};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use with_resources::{AjaxPayload, Cargo, ResourceClient, ResourceType, StoreClient, StoreError};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AnimalError {
    #[error("Store communication error: {0}")]
    StoreCommunication(String),
    #[error("Retrieval failed: {0}")]
    Fetch(String),
    #[error("No image for {0}")]
    MissingImage(String),
}

#[derive(Clone)]
pub struct AnimalClient {
    store: StoreClient,
    resource_type: ResourceType,
}

impl AnimalClient {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            resource_type: ResourceType::from(ANIMALS),
        }
    }

    pub fn cargo(kind: &str) -> Cargo {
        Cargo::new(RETRIEVE_ONE, queries_input([("kind", kind.to_string())]))
    }
}

#[async_trait]
impl ResourceClient for AnimalClient {
    type Error = AnimalError;

    fn store(&self) -> &StoreClient {
        &self.store
    }

    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    fn map_error(e: StoreError) -> Self::Error {
        AnimalError::StoreCommunication(e.to_string())
    }
}

impl AnimalClient {
    /// Fetches a picture of `kind`, reusing a cached one when available.
    #[instrument(skip(self))]
    pub async fn retrieve_one(&self, kind: &str) -> Result<String, AnimalError> {
        debug!("Sending request");
        let cargo = Self::cargo(kind);
        self.ajax(AjaxPayload::new(cargo.clone()).use_last(true))
            .await?;
        let operation = self.wait_settled(&cargo).await?;
        if operation.status.has_error() {
            return Err(AnimalError::Fetch(
                operation.status.error.unwrap_or_default(),
            ));
        }
        operation
            .data
            .as_ref()
            .and_then(|data| data.get("image"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AnimalError::MissingImage(kind.to_string()))
    }
}
