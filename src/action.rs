//! # Actions
//!
//! The closed action vocabulary of a resource duck.
//!
//! Every resource type understands the same seven actions. They are modeled as
//! one enum, [`ResourceAction`], so the reducer and the epics match on them
//! exhaustively; [`Action`] adds the resource type the action is addressed to.
//!
//! | Variant | Effect |
//! |---------|--------|
//! | `Register` | one more observer of an operation |
//! | `Deregister` | one observer fewer |
//! | `Ajax` | fetch intent, status goes to loading |
//! | `AjaxSuccess` | fetch resolved, data stored |
//! | `AjaxFailure` | fetch rejected, error stored |
//! | `Reset` | operation entry wiped |
//! | `ClearCache` | memoized results discarded |

use crate::error::FetchError;
use crate::hash::{hash, InputHash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identifier of a family of fetchable data (e.g. `"users"`, `"animals"`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(Arc<str>);

impl ResourceType {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceType {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ResourceType::from)
    }
}

/// The `{method, input}` pair every action is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub method: String,
    #[serde(default)]
    pub input: Value,
}

impl Cargo {
    pub fn new(method: impl Into<String>, input: Value) -> Self {
        Self {
            method: method.into(),
            input,
        }
    }

    /// Cargo without input; hashes to the empty-input key.
    pub fn method(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    pub fn input_hash(&self) -> InputHash {
        hash(&self.input)
    }
}

/// Options carried by `Register` and `Deregister`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOptions {
    /// Fetch on every registration, not only the first one.
    pub ajax_on_hot_register: bool,
    /// Reset the entry once the last observer deregisters.
    pub reset_on_last_deregister: bool,
    /// Forwarded to the fetch the register epic synthesizes.
    pub use_last: bool,
    /// Track the observer without letting the register epic fetch.
    pub skip_fetch: bool,
}

/// Options carried by `Ajax`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AjaxOptions {
    /// Accept a result still held by the memoizer instead of forcing a
    /// fresh call.
    pub use_last: bool,
}

/// A user callback invoked after a fetch result has been committed.
pub struct Callback<E>(Arc<dyn Fn(E) + Send + Sync>);

impl<E> Callback<E> {
    pub fn new(f: impl Fn(E) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, event: E) {
        (self.0)(event)
    }
}

impl<E> Clone for Callback<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E> fmt::Debug for Callback<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Passed to `on_success` callbacks. `data` is the full result, keyed by
/// method.
#[derive(Debug, Clone)]
pub struct AjaxSucceeded {
    pub cargo: Cargo,
    pub data: Value,
}

/// Passed to `on_failure` callbacks.
#[derive(Debug, Clone)]
pub struct AjaxFailed {
    pub cargo: Cargo,
    pub error: FetchError,
}

/// Payload of the `Ajax` action.
#[derive(Debug, Clone)]
pub struct AjaxPayload {
    pub cargo: Cargo,
    pub options: AjaxOptions,
    pub on_success: Option<Callback<AjaxSucceeded>>,
    pub on_failure: Option<Callback<AjaxFailed>>,
}

impl AjaxPayload {
    pub fn new(cargo: Cargo) -> Self {
        Self {
            cargo,
            options: AjaxOptions::default(),
            on_success: None,
            on_failure: None,
        }
    }

    pub fn use_last(mut self, use_last: bool) -> Self {
        self.options.use_last = use_last;
        self
    }

    pub fn on_success(mut self, f: impl Fn(AjaxSucceeded) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Callback::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl Fn(AjaxFailed) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Callback::new(f));
        self
    }
}

impl From<Cargo> for AjaxPayload {
    fn from(cargo: Cargo) -> Self {
        Self::new(cargo)
    }
}

/// The action vocabulary of one resource type.
#[derive(Debug, Clone)]
pub enum ResourceAction {
    Register {
        cargo: Cargo,
        options: RegisterOptions,
    },
    Deregister {
        cargo: Cargo,
        options: RegisterOptions,
    },
    Ajax(AjaxPayload),
    /// `generation` ties the result to the `Ajax` that produced it; `None`
    /// applies the result unconditionally.
    AjaxSuccess {
        cargo: Cargo,
        data: Value,
        generation: Option<u64>,
        on_success: Option<Callback<AjaxSucceeded>>,
    },
    AjaxFailure {
        cargo: Cargo,
        error: FetchError,
        generation: Option<u64>,
        on_failure: Option<Callback<AjaxFailed>>,
    },
    Reset {
        cargo: Cargo,
    },
    /// `None` keeps the configured cache timeout.
    ClearCache {
        timeout: Option<Duration>,
    },
}

impl ResourceAction {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceAction::Register { .. } => "REGISTER",
            ResourceAction::Deregister { .. } => "DEREGISTER",
            ResourceAction::Ajax(_) => "AJAX",
            ResourceAction::AjaxSuccess { .. } => "AJAX_SUCCESS",
            ResourceAction::AjaxFailure { .. } => "AJAX_FAILURE",
            ResourceAction::Reset { .. } => "RESET",
            ResourceAction::ClearCache { .. } => "CLEAR_CACHE",
        }
    }

    pub fn cargo(&self) -> Option<&Cargo> {
        match self {
            ResourceAction::Register { cargo, .. }
            | ResourceAction::Deregister { cargo, .. }
            | ResourceAction::AjaxSuccess { cargo, .. }
            | ResourceAction::AjaxFailure { cargo, .. }
            | ResourceAction::Reset { cargo } => Some(cargo),
            ResourceAction::Ajax(payload) => Some(&payload.cargo),
            ResourceAction::ClearCache { .. } => None,
        }
    }
}

/// A [`ResourceAction`] addressed to a resource type.
#[derive(Debug, Clone)]
pub struct Action {
    pub resource_type: ResourceType,
    pub action: ResourceAction,
}

impl Action {
    pub fn new(resource_type: ResourceType, action: ResourceAction) -> Self {
        Self {
            resource_type,
            action,
        }
    }
}

/// Builds [`Action`]s for one resource type.
#[derive(Debug, Clone)]
pub struct ActionCreators {
    resource_type: ResourceType,
}

impl ActionCreators {
    pub fn new(resource_type: ResourceType) -> Self {
        Self { resource_type }
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    fn wrap(&self, action: ResourceAction) -> Action {
        Action::new(self.resource_type.clone(), action)
    }

    pub fn register(&self, cargo: Cargo, options: RegisterOptions) -> Action {
        self.wrap(ResourceAction::Register { cargo, options })
    }

    pub fn deregister(&self, cargo: Cargo, options: RegisterOptions) -> Action {
        self.wrap(ResourceAction::Deregister { cargo, options })
    }

    pub fn ajax(&self, payload: impl Into<AjaxPayload>) -> Action {
        self.wrap(ResourceAction::Ajax(payload.into()))
    }

    pub fn ajax_success(&self, cargo: Cargo, data: Value) -> Action {
        self.wrap(ResourceAction::AjaxSuccess {
            cargo,
            data,
            generation: None,
            on_success: None,
        })
    }

    pub fn ajax_failure(&self, cargo: Cargo, error: FetchError) -> Action {
        self.wrap(ResourceAction::AjaxFailure {
            cargo,
            error,
            generation: None,
            on_failure: None,
        })
    }

    pub fn reset(&self, cargo: Cargo) -> Action {
        self.wrap(ResourceAction::Reset { cargo })
    }

    pub fn clear_cache(&self, timeout: Option<Duration>) -> Action {
        self.wrap(ResourceAction::ClearCache { timeout })
    }
}
