//! # Data Managers
//!
//! A `DataManager` is the opaque async backend of one resource type. The
//! engine never looks inside it: it hands over a [`Cargo`] and expects an
//! object keyed by the method name back, e.g. `{"retrieveOne": {...}}`.
//!
//! Most backends are a handful of named async functions, which is what
//! [`MethodTable`] builds without a hand-written trait impl.

use crate::action::Cargo;
use crate::error::FetchError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Async backend of one resource type.
#[async_trait]
pub trait DataManager: Send + Sync + 'static {
    /// Performs `cargo.method` with `cargo.input`.
    ///
    /// On success the value must be an object whose `cargo.method` key holds
    /// the result; the reducer stores exactly that key.
    async fn fetch(&self, cargo: &Cargo) -> Result<Value, FetchError>;
}

type MethodFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, FetchError>> + Send + Sync>;

/// A [`DataManager`] assembled from per-method async functions.
///
/// Each function receives the operation input and returns the bare result;
/// the table wraps it under the method name.
///
/// ```rust
/// use serde_json::json;
/// use with_resources::{FetchError, MethodTable};
///
/// let animals = MethodTable::new().method("retrieveOne", |input| async move {
///     let kind = input["kind"].as_str().unwrap_or("cat").to_string();
///     Ok::<_, FetchError>(json!({ "image": format!("{kind}.png") }))
/// });
/// assert!(animals.has_method("retrieveOne"));
/// ```
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, MethodFn>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
    {
        self.methods
            .insert(name.into(), Arc::new(move |input| f(input).boxed()));
        self
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodTable").field("methods", &names).finish()
    }
}

#[async_trait]
impl DataManager for MethodTable {
    async fn fetch(&self, cargo: &Cargo) -> Result<Value, FetchError> {
        let Some(method) = self.methods.get(&cargo.method) else {
            return Err(FetchError::UnknownMethod(cargo.method.clone()));
        };
        let result = method(cargo.input.clone()).await?;
        let mut keyed = Map::new();
        keyed.insert(cargo.method.clone(), result);
        Ok(Value::Object(keyed))
    }
}
