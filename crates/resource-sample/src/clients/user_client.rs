//! # User Client
use crate::model::{queries_input, User, RETRIEVE_USERS, USERS};
use async_trait::async_trait;
use tracing::{debug, instrument};
use with_resources::{AjaxPayload, Cargo, ResourceClient, ResourceType, StoreClient, StoreError};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UserError {
    #[error("Store communication error: {0}")]
    StoreCommunication(String),
    #[error("Retrieval failed: {0}")]
    Fetch(String),
    #[error("Malformed user list: {0}")]
    Decode(String),
}

#[derive(Clone)]
pub struct UserClient {
    store: StoreClient,
    resource_type: ResourceType,
}

impl UserClient {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            resource_type: ResourceType::from(USERS),
        }
    }

    pub fn cargo(page: u32, page_size: u32) -> Cargo {
        Cargo::new(
            RETRIEVE_USERS,
            queries_input([("page", page), ("pageSize", page_size)]),
        )
    }
}

#[async_trait]
impl ResourceClient for UserClient {
    type Error = UserError;

    fn store(&self) -> &StoreClient {
        &self.store
    }

    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    fn map_error(e: StoreError) -> Self::Error {
        UserError::StoreCommunication(e.to_string())
    }
}

impl UserClient {
    #[instrument(skip(self))]
    pub async fn retrieve_users(&self, page: u32, page_size: u32) -> Result<Vec<User>, UserError> {
        debug!("Sending request");
        let cargo = Self::cargo(page, page_size);
        self.ajax(AjaxPayload::new(cargo.clone()).use_last(true))
            .await?;
        let operation = self.wait_settled(&cargo).await?;
        if operation.status.has_error() {
            return Err(UserError::Fetch(operation.status.error.unwrap_or_default()));
        }
        let users = operation
            .data
            .and_then(|mut data| data.get_mut("users").map(serde_json::Value::take))
            .unwrap_or_default();
        serde_json::from_value(users).map_err(|e| UserError::Decode(e.to_string()))
    }
}
