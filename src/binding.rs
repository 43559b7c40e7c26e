//! # Subscription Binding
//!
//! The framework-agnostic half of a UI component that reads resources. A
//! component declares the operations it needs; the binding keeps the store in
//! sync with that declaration across its lifecycle:
//!
//! | Lifecycle | Binding call | Store sees |
//! |-----------|--------------|------------|
//! | first render done | [`ResourceBinding::mount`] | `Reset` (if asked) then `Register` per operation |
//! | props changed | [`ResourceBinding::update`] | `Deregister` for dropped operations, `Register` for new ones |
//! | unmounted | [`ResourceBinding::unmount`] | `Deregister` per registration, once |
//!
//! Operations without a method are *data-only*: they select their resource
//! type's slice into the [`DerivedState`] but never register.
//!
//! ## Combined status
//!
//! [`CombinedStatus`] folds the status of every methodful operation the same
//! way a JavaScript `reduce(or, false)` / `reduce(and, true)` would, including
//! how `None` propagates:
//!
//! ```text
//! or(acc, x)  = if acc == Some(true) { acc } else { x }
//! and(acc, x) = if acc == Some(true) { x } else { acc }
//! ```
//!
//! Before the first mount an autorun operation reports `loading: Some(true)`
//! since its fetch is about to start, and an operation that resets on mount
//! reports nothing at all.

use crate::action::{ActionCreators, AjaxPayload, Cargo, RegisterOptions, ResourceType};
use crate::client::StoreClient;
use crate::error::StoreError;
use crate::hash::{hash, InputHash, InputRef};
use crate::registry::{Operation, OperationKey, Registry, SubscriptionToken};
use crate::state::{GlobalState, OperationState, ResourceState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOptions {
    /// Let the register epic fetch when this binding registers.
    pub autorun: bool,
    /// Accept a cached result for fetches this binding triggers.
    pub use_last: bool,
    /// Reset the operation right before registering it.
    pub reset: bool,
    /// Fetch when this operation replaces one with the same resource type
    /// and method but another input.
    pub run_on_input_change: bool,
    pub ajax_on_hot_register: bool,
    pub reset_on_last_deregister: bool,
    /// Older spelling of `autorun`.
    pub run_on_did_mount: bool,
}

impl OperationOptions {
    pub fn autoruns(&self) -> bool {
        self.autorun || self.run_on_did_mount
    }

    fn register_options(&self) -> RegisterOptions {
        RegisterOptions {
            ajax_on_hot_register: self.ajax_on_hot_register,
            reset_on_last_deregister: self.reset_on_last_deregister,
            use_last: self.use_last,
            skip_fetch: !self.autoruns(),
        }
    }
}

/// One operation a component asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub resource_type: ResourceType,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub options: OperationOptions,
}

/// Descriptor identity: options do not take part.
type DescriptorKey = (ResourceType, Option<String>, InputHash);

impl OperationDescriptor {
    pub fn new(
        resource_type: impl Into<ResourceType>,
        method: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            method: Some(method.into()),
            input,
            options: OperationOptions::default(),
        }
    }

    /// A descriptor that only selects `resource_type`'s slice.
    pub fn data(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            method: None,
            input: Value::Null,
            options: OperationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OperationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn autorun(mut self) -> Self {
        self.options.autorun = true;
        self
    }

    pub fn operation(&self) -> Option<Operation> {
        let method = self.method.as_ref()?;
        Some(Operation {
            resource_type: self.resource_type.clone(),
            cargo: Cargo::new(method.clone(), self.input.clone()),
        })
    }

    fn key(&self) -> DescriptorKey {
        (
            self.resource_type.clone(),
            self.method.clone(),
            hash(&self.input),
        )
    }
}

/// Keeps the first of structurally equal descriptors.
fn dedupe(operations: Vec<OperationDescriptor>) -> Vec<OperationDescriptor> {
    let mut seen = HashSet::new();
    operations
        .into_iter()
        .filter(|descriptor| seen.insert(descriptor.key()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombinedStatus {
    pub loading: Option<bool>,
    pub success: Option<bool>,
    pub error: String,
}

fn js_or(acc: Option<bool>, x: Option<bool>) -> Option<bool> {
    if acc == Some(true) {
        acc
    } else {
        x
    }
}

fn js_and(acc: Option<bool>, x: Option<bool>) -> Option<bool> {
    if acc == Some(true) {
        x
    } else {
        acc
    }
}

/// Folds the status of every methodful operation in `operations`.
pub fn combined_status(
    operations: &[OperationDescriptor],
    derived: &DerivedState,
    mounted: bool,
) -> CombinedStatus {
    let mut loading = Some(false);
    let mut success = Some(true);
    let mut failed = Vec::new();

    for descriptor in operations {
        let Some(method) = descriptor.method.as_deref() else {
            continue;
        };
        if !mounted && descriptor.options.autoruns() {
            loading = js_or(loading, Some(true));
            success = js_and(success, None);
            continue;
        }
        if !mounted && descriptor.options.reset {
            loading = js_or(loading, None);
            success = js_and(success, None);
            continue;
        }
        let status = derived
            .get_operation(&descriptor.resource_type, method, &descriptor.input)
            .map(|operation| &operation.status);
        loading = js_or(loading, status.and_then(|s| s.loading));
        success = js_and(success, Some(status.and_then(|s| s.success).unwrap_or(true)));
        if status.is_some_and(|s| s.has_error()) {
            failed.push(format!("{}.{}", descriptor.resource_type, method));
        }
    }

    let error = if failed.is_empty() {
        String::new()
    } else {
        format!("Got error in {}", failed.join(", "))
    };
    CombinedStatus {
        loading,
        success,
        error,
    }
}

/// The slices a binding reads, one per referenced resource type.
///
/// Two derived states are equal when they point at the same slices, which
/// is exactly when nothing the binding can see has changed.
#[derive(Clone, Default)]
pub struct DerivedState {
    slices: BTreeMap<ResourceType, Arc<ResourceState>>,
}

impl DerivedState {
    pub fn get(&self, resource_type: &ResourceType) -> Option<&Arc<ResourceState>> {
        self.slices.get(resource_type)
    }

    pub fn get_operation<'i>(
        &self,
        resource_type: &ResourceType,
        method: &str,
        input: impl Into<InputRef<'i>>,
    ) -> Option<&OperationState> {
        self.get(resource_type)?.get_operation(method, input)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.slices.keys()
    }
}

impl PartialEq for DerivedState {
    fn eq(&self, other: &Self) -> bool {
        self.slices.len() == other.slices.len()
            && self
                .slices
                .iter()
                .zip(other.slices.iter())
                .all(|((a_rt, a), (b_rt, b))| a_rt == b_rt && Arc::ptr_eq(a, b))
    }
}

impl fmt::Debug for DerivedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slices.keys()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    resource_types: BTreeSet<ResourceType>,
}

impl Selector {
    fn new(operations: &[OperationDescriptor]) -> Self {
        Self {
            resource_types: operations
                .iter()
                .map(|descriptor| descriptor.resource_type.clone())
                .collect(),
        }
    }

    fn select(&self, state: &GlobalState) -> DerivedState {
        DerivedState {
            slices: self
                .resource_types
                .iter()
                .filter_map(|rt| Some((rt.clone(), Arc::clone(state.resource(rt)?))))
                .collect(),
        }
    }
}

pub struct ResourceBinding {
    registry: Registry,
    operations: Vec<OperationDescriptor>,
    registrations: BTreeMap<OperationKey, SubscriptionToken>,
    selector: Selector,
    derived: DerivedState,
    updates: watch::Receiver<Arc<GlobalState>>,
    mounted: bool,
}

impl ResourceBinding {
    pub fn new(store: StoreClient, operations: Vec<OperationDescriptor>) -> Self {
        let operations = dedupe(operations);
        let selector = Selector::new(&operations);
        let mut updates = store.subscribe();
        let derived = selector.select(&updates.borrow_and_update());
        Self {
            registry: Registry::new(store),
            operations,
            registrations: BTreeMap::new(),
            selector,
            derived,
            updates,
            mounted: false,
        }
    }

    pub fn store(&self) -> &StoreClient {
        self.registry.store()
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn derived(&self) -> &DerivedState {
        &self.derived
    }

    pub fn status(&self) -> CombinedStatus {
        combined_status(&self.operations, &self.derived, self.mounted)
    }

    /// Registers every methodful operation. A second call is a no-op.
    pub async fn mount(&mut self) -> Result<(), StoreError> {
        if self.mounted {
            return Ok(());
        }
        for descriptor in self.operations.clone() {
            self.attach(&descriptor).await?;
        }
        self.mounted = true;
        debug!(registrations = self.registrations.len(), "Binding mounted");
        self.refresh();
        Ok(())
    }

    /// Replaces the declared operations, registering and deregistering the
    /// difference when mounted.
    ///
    /// On a store error the previous operations stay declared. Registrations
    /// already made are tracked, so a later `update`, `unmount` or drop
    /// settles them.
    pub async fn update(&mut self, operations: Vec<OperationDescriptor>) -> Result<(), StoreError> {
        let next = dedupe(operations);
        if self.mounted {
            self.reconcile(&next).await?;
        }

        let selector = Selector::new(&next);
        if selector != self.selector {
            self.selector = selector;
        }
        self.operations = next;
        self.refresh();
        Ok(())
    }

    /// Brings the registrations in line with `next`.
    async fn reconcile(&mut self, next: &[OperationDescriptor]) -> Result<(), StoreError> {
        let next_keys: HashSet<OperationKey> = next
            .iter()
            .filter_map(OperationDescriptor::operation)
            .map(|operation| operation.key())
            .collect();
        let stale: Vec<OperationKey> = self
            .registrations
            .keys()
            .filter(|key| !next_keys.contains(*key))
            .cloned()
            .collect();
        for key in &stale {
            self.detach(key).await?;
        }

        for descriptor in next {
            if !self.attach(descriptor).await? {
                continue;
            }
            let Some(operation) = descriptor.operation() else {
                continue;
            };
            let replaced = stale.iter().any(|old| {
                old.resource_type == operation.resource_type && old.method == operation.cargo.method
            });
            if replaced && descriptor.options.run_on_input_change && !descriptor.options.autoruns() {
                debug!(operation = %operation.key(), "Input changed, fetching");
                let creators = ActionCreators::new(operation.resource_type);
                self.registry
                    .store()
                    .dispatch(creators.ajax(
                        AjaxPayload::new(operation.cargo).use_last(descriptor.options.use_last),
                    ))
                    .await?;
            }
        }
        Ok(())
    }

    /// Deregisters every registration exactly once.
    pub async fn unmount(mut self) -> Result<(), StoreError> {
        self.mounted = false;
        self.registrations.clear();
        let actions = self.registry.drain();
        debug!(deregistrations = actions.len(), "Binding unmounted");
        self.registry.store().dispatch_all(actions).await
    }

    /// Waits until a slice this binding reads changes and returns the new
    /// derived state.
    pub async fn changed(&mut self) -> Result<DerivedState, StoreError> {
        loop {
            if self.refresh() {
                return Ok(self.derived.clone());
            }
            self.updates
                .changed()
                .await
                .map_err(|_| StoreError::StoreClosed)?;
        }
    }

    /// Re-selects from the latest published state. Returns whether the
    /// derived state changed.
    fn refresh(&mut self) -> bool {
        let next = self.selector.select(&self.updates.borrow_and_update());
        if next == self.derived {
            return false;
        }
        self.derived = next;
        true
    }

    /// Registers `descriptor` unless it is data-only or already registered.
    /// Returns whether a registration was made.
    async fn attach(&mut self, descriptor: &OperationDescriptor) -> Result<bool, StoreError> {
        let Some(operation) = descriptor.operation() else {
            return Ok(false);
        };
        let key = operation.key();
        if self.registrations.contains_key(&key) {
            return Ok(false);
        }
        if descriptor.options.reset {
            let creators = ActionCreators::new(operation.resource_type.clone());
            self.registry
                .store()
                .dispatch(creators.reset(operation.cargo.clone()))
                .await?;
        }
        let token = self
            .registry
            .subscribe(operation, descriptor.options.register_options())
            .await?;
        self.registrations.insert(key, token);
        Ok(true)
    }

    async fn detach(&mut self, key: &OperationKey) -> Result<(), StoreError> {
        if let Some(token) = self.registrations.remove(key) {
            self.registry.unsubscribe(token).await?;
        }
        Ok(())
    }
}

impl Drop for ResourceBinding {
    fn drop(&mut self) {
        let actions = self.registry.drain();
        if actions.is_empty() {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                let store = self.registry.store().clone();
                handle.spawn(async move {
                    if let Err(e) = store.dispatch_all(actions).await {
                        debug!(error = %e, "Deregistration after drop failed");
                    }
                });
            }
            Err(_) => {
                warn!(
                    registrations = actions.len(),
                    "Binding dropped outside a runtime, registrations left behind"
                );
            }
        }
    }
}

impl fmt::Debug for ResourceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBinding")
            .field("operations", &self.operations.len())
            .field("registrations", &self.registrations.len())
            .field("derived", &self.derived)
            .field("mounted", &self.mounted)
            .finish()
    }
}
