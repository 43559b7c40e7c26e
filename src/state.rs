//! # State Tree
//!
//! ```text
//! GlobalState
//! └── resource type ──► ResourceState (Arc)
//!     └── method
//!         └── input hash ──► OperationState { input, status, meta, data }
//! ```
//!
//! Each resource slice sits behind an `Arc`. The reducer only allocates a new
//! slice when something changed, so comparing slices with [`Arc::ptr_eq`] is a
//! valid (and cheap) change check for subscribers.

use crate::action::ResourceType;
use crate::hash::{InputHash, InputRef};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tri-state status of an operation. `None` means "never ran".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    pub loading: Option<bool>,
    pub success: Option<bool>,
    /// `Some("")` after a success, the error message after a failure.
    pub error: Option<String>,
}

impl OperationStatus {
    pub fn loading() -> Self {
        Self {
            loading: Some(true),
            success: None,
            error: None,
        }
    }

    pub fn succeeded() -> Self {
        Self {
            loading: Some(false),
            success: Some(true),
            error: Some(String::new()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loading: Some(false),
            success: Some(false),
            error: Some(error.into()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading == Some(true)
    }

    /// True once a fetch resolved or rejected.
    pub fn is_settled(&self) -> bool {
        self.loading == Some(false)
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationMeta {
    /// Observers currently mounted on this operation.
    pub render_count: u32,
    pub hot: bool,
    pub last_ajax_success: Option<DateTime<Utc>>,
    pub last_reset: Option<DateTime<Utc>>,
    /// Generation of the latest `Ajax`; older results are discarded.
    pub generation: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationState {
    pub input: Value,
    pub status: OperationStatus,
    pub meta: OperationMeta,
    pub data: Option<Value>,
}

/// All operations of one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceState {
    methods: BTreeMap<String, BTreeMap<InputHash, OperationState>>,
    next_generation: u64,
}

impl ResourceState {
    pub fn get_method(&self, method: &str) -> Option<&BTreeMap<InputHash, OperationState>> {
        self.methods.get(method)
    }

    pub fn get_operation<'i>(
        &self,
        method: &str,
        input: impl Into<InputRef<'i>>,
    ) -> Option<&OperationState> {
        let key = input.into().resolve();
        self.methods.get(method)?.get(&key)
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub(crate) fn entry(&mut self, method: &str, key: InputHash) -> &mut OperationState {
        self.methods
            .entry(method.to_string())
            .or_default()
            .entry(key)
            .or_default()
    }

    pub(crate) fn replace(&mut self, method: &str, key: InputHash, operation: OperationState) {
        self.methods
            .entry(method.to_string())
            .or_default()
            .insert(key, operation);
    }

    pub(crate) fn allocate_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}

/// The whole store: one slice per resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalState {
    #[serde(serialize_with = "serialize_slices")]
    resources: BTreeMap<ResourceType, Arc<ResourceState>>,
}

fn serialize_slices<S: Serializer>(
    resources: &BTreeMap<ResourceType, Arc<ResourceState>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(resources.iter().map(|(resource_type, slice)| (resource_type, &**slice)))
}

impl GlobalState {
    pub fn resource(&self, resource_type: &ResourceType) -> Option<&Arc<ResourceState>> {
        self.resources.get(resource_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.resources.keys()
    }

    /// Returns a copy with `resource_type` pointing at `slice`. Other slices
    /// are shared, not cloned.
    pub fn with_resource(&self, resource_type: ResourceType, slice: Arc<ResourceState>) -> Self {
        let mut resources = self.resources.clone();
        resources.insert(resource_type, slice);
        Self { resources }
    }

    /// Whether `resource_type`'s slice differs (by pointer) between two states.
    pub fn slice_changed(&self, other: &GlobalState, resource_type: &ResourceType) -> bool {
        match (self.resource(resource_type), other.resource(resource_type)) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        }
    }

    pub fn get_operation<'i>(
        &self,
        resource_type: &ResourceType,
        method: &str,
        input: impl Into<InputRef<'i>>,
    ) -> Option<&OperationState> {
        self.resource(resource_type)?.get_operation(method, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;
    use serde_json::json;

    #[test]
    fn test_global_state_serializes_through_slices() {
        let mut slice = ResourceState::default();
        let input = json!({ "kind": "fox" });
        let key = hash(&input);
        slice.entry("retrieveOne", key.clone()).data = Some(json!({ "image": "fox.png" }));
        let state = GlobalState::default().with_resource("animals".into(), Arc::new(slice));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value["resources"]["animals"]["methods"]["retrieveOne"][key.as_str()]["data"],
            json!({ "image": "fox.png" })
        );
    }

    #[test]
    fn test_status_constructors() {
        assert!(OperationStatus::loading().is_loading());
        assert!(!OperationStatus::default().is_settled());
        let ok = OperationStatus::succeeded();
        assert!(ok.is_settled() && !ok.has_error());
        let failed = OperationStatus::failed("timeout");
        assert!(failed.has_error());
        assert_eq!(failed.success, Some(false));
    }

    #[test]
    fn test_lookup_by_input_or_hash() {
        let mut slice = ResourceState::default();
        let input = json!({ "kind": "fox" });
        slice.entry("retrieveOne", hash(&input)).input = input.clone();

        assert!(slice.get_operation("retrieveOne", &input).is_some());
        assert!(slice.get_operation("retrieveOne", &hash(&input)).is_some());
        assert!(slice.get_operation("retrieveAll", &input).is_none());
    }

    #[test]
    fn test_with_resource_shares_other_slices() {
        let users = ResourceType::from("users");
        let animals = ResourceType::from("animals");
        let base = GlobalState::default()
            .with_resource(users.clone(), Arc::default())
            .with_resource(animals.clone(), Arc::default());

        let next = base.with_resource(animals.clone(), Arc::new(ResourceState::default()));
        assert!(!base.slice_changed(&next, &users));
        assert!(base.slice_changed(&next, &animals));
    }
}
