//! # Errors
//!
//! Error types used throughout the crate. Each concern gets its own enum so
//! callers can match on exactly the failures a given API can produce.

use crate::action::ResourceType;

/// Errors returned by [`StoreClient`](crate::client::StoreClient) calls.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store closed")]
    StoreClosed,
    #[error("Store dropped response channel")]
    StoreDropped,
}

/// Failure reported by a [`DataManager`](crate::data_manager::DataManager).
///
/// A single pending fetch is shared by every caller hitting the same memoized
/// entry, so the error has to be cloneable.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FetchError {
    /// Free-form failure; its message is what ends up in `status.error`.
    #[error("{0}")]
    Failed(String),
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    #[error("HTTP {code}: {message}")]
    Http { code: u16, message: String },
}

impl FetchError {
    pub fn failed(message: impl Into<String>) -> Self {
        FetchError::Failed(message.into())
    }
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        FetchError::Failed(message)
    }
}

/// Errors raised by [`configure`](crate::setup::configure).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("No data manager registered for resource type {0}")]
    MissingDataManager(ResourceType),
    #[error("Data manager registered for undeclared resource type {0}")]
    UndeclaredResourceType(ResourceType),
    #[error("Resource type {0} declared more than once")]
    DuplicateResourceType(ResourceType),
    #[error("Resource type name {0} declared more than once")]
    DuplicateName(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Errors raised while loading a resource type's custom getters.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GetterLoadError {
    #[error("No getters available for resource type {0}")]
    NotFound(ResourceType),
    #[error("Getter loading failed: {0}")]
    Failed(String),
}

/// Errors raised while reading [`Settings`](crate::config::Settings).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
}
