//! # Setup
//!
//! [`configure`] turns a [`ResourcesConfig`] into [`Resources`]: one duck per
//! declared resource type, combined into a [`RootReducer`] and a
//! [`RootEpic`]. [`Resources::start`] then builds the store actor.
//!
//! ```rust
//! use serde_json::json;
//! use with_resources::{configure, MethodTable, ResourcesConfig};
//!
//! let users = MethodTable::new().method("list", |_input| async move { Ok(json!([])) });
//! let resources = configure(
//!     ResourcesConfig::new()
//!         .resource_type("USERS", "users")
//!         .data_manager("users", users),
//! )
//! .unwrap();
//! assert_eq!(resources.resource_type("USERS").unwrap().as_str(), "users");
//! ```

use crate::action::{ActionCreators, ResourceType};
use crate::binding::{OperationDescriptor, ResourceBinding};
use crate::client::StoreClient;
use crate::config::Settings;
use crate::data_manager::DataManager;
use crate::duck::ResourceDuck;
use crate::epics::RootEpic;
use crate::error::SetupError;
use crate::getters::{GetterLoader, GetterSet, Getters};
use crate::reducer::RootReducer;
use crate::store::StoreActor;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Everything [`configure`] needs.
#[derive(Default)]
pub struct ResourcesConfig {
    settings: Settings,
    resource_types: Vec<(String, ResourceType)>,
    data_managers: Vec<(ResourceType, Arc<dyn DataManager>)>,
    getters: Vec<(ResourceType, GetterSet)>,
    getter_loader: Option<Arc<dyn GetterLoader>>,
}

impl ResourcesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Declares a resource type under a symbolic name, e.g. `USERS => "users"`.
    pub fn resource_type(mut self, name: impl Into<String>, resource_type: impl Into<ResourceType>) -> Self {
        self.resource_types.push((name.into(), resource_type.into()));
        self
    }

    pub fn data_manager(
        mut self,
        resource_type: impl Into<ResourceType>,
        data_manager: impl DataManager,
    ) -> Self {
        let data_manager: Arc<dyn DataManager> = Arc::new(data_manager);
        self.data_managers.push((resource_type.into(), data_manager));
        self
    }

    /// Registers custom getters for a resource type up front.
    pub fn getters(mut self, resource_type: impl Into<ResourceType>, getters: GetterSet) -> Self {
        self.getters.push((resource_type.into(), getters));
        self
    }

    /// Loads the remaining custom getters asynchronously, see
    /// [`Resources::getters_loaded`].
    pub fn getter_loader(mut self, loader: impl GetterLoader + 'static) -> Self {
        let loader: Arc<dyn GetterLoader> = Arc::new(loader);
        self.getter_loader = Some(loader);
        self
    }
}

impl fmt::Debug for ResourcesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data_managers: Vec<_> = self.data_managers.iter().map(|(rt, _)| rt).collect();
        f.debug_struct("ResourcesConfig")
            .field("settings", &self.settings)
            .field("resource_types", &self.resource_types)
            .field("data_managers", &data_managers)
            .field("getter_loader", &self.getter_loader.is_some())
            .finish()
    }
}

/// Builds the ducks for every declared resource type.
///
/// Fails on unusable settings, when a declared resource type has no data
/// manager, when a data manager or getter set names an undeclared one, or
/// when a name or resource type is declared or served twice.
pub fn configure(config: ResourcesConfig) -> Result<Resources, SetupError> {
    let ResourcesConfig {
        settings,
        resource_types,
        data_managers,
        getters,
        getter_loader,
    } = config;
    settings
        .validate()
        .map_err(|e| SetupError::InvalidSettings(e.to_string()))?;

    let mut names = BTreeMap::new();
    let mut declared = BTreeSet::new();
    for (name, resource_type) in resource_types {
        if names.contains_key(&name) {
            return Err(SetupError::DuplicateName(name));
        }
        if !declared.insert(resource_type.clone()) {
            return Err(SetupError::DuplicateResourceType(resource_type));
        }
        names.insert(name, resource_type);
    }

    let mut managers = BTreeMap::new();
    for (resource_type, data_manager) in data_managers {
        if !declared.contains(&resource_type) {
            return Err(SetupError::UndeclaredResourceType(resource_type));
        }
        if managers.insert(resource_type.clone(), data_manager).is_some() {
            return Err(SetupError::DuplicateResourceType(resource_type));
        }
    }

    let mut custom: BTreeMap<ResourceType, GetterSet> = BTreeMap::new();
    for (resource_type, set) in getters {
        if !declared.contains(&resource_type) {
            return Err(SetupError::UndeclaredResourceType(resource_type));
        }
        custom.entry(resource_type).or_default().extend(set);
    }

    let mut ducks = BTreeMap::new();
    for resource_type in declared {
        let data_manager = managers
            .remove(&resource_type)
            .ok_or_else(|| SetupError::MissingDataManager(resource_type.clone()))?;
        let getters = Getters::new(resource_type.clone())
            .with_custom(custom.remove(&resource_type).unwrap_or_default());
        let duck = ResourceDuck::new(resource_type.clone(), data_manager, settings.memoize_options())
            .with_getters(getters);
        ducks.insert(resource_type, Arc::new(duck));
    }
    debug!(resource_types = ducks.len(), "Resources configured");

    let ducks = Arc::new(ducks);
    Ok(Resources {
        reducer: RootReducer::new(Arc::clone(&ducks)),
        epics: RootEpic::new(Arc::clone(&ducks)),
        ducks,
        names,
        settings,
        getter_loader,
    })
}

/// The configured engine, ready to start a store.
pub struct Resources {
    ducks: Arc<BTreeMap<ResourceType, Arc<ResourceDuck>>>,
    names: BTreeMap<String, ResourceType>,
    reducer: RootReducer,
    epics: RootEpic,
    settings: Settings,
    getter_loader: Option<Arc<dyn GetterLoader>>,
}

impl Resources {
    /// Symbolic name to resource type, as declared.
    pub fn resource_types(&self) -> &BTreeMap<String, ResourceType> {
        &self.names
    }

    pub fn resource_type(&self, name: &str) -> Option<&ResourceType> {
        self.names.get(name)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reducer(&self) -> &RootReducer {
        &self.reducer
    }

    pub fn epics(&self) -> &RootEpic {
        &self.epics
    }

    pub fn duck(&self, resource_type: &ResourceType) -> Option<&Arc<ResourceDuck>> {
        self.ducks.get(resource_type)
    }

    pub fn action_creators_of(&self, resource_type: &ResourceType) -> Option<&ActionCreators> {
        self.duck(resource_type).map(|duck| duck.action_creators())
    }

    pub fn getters_of(&self, resource_type: &ResourceType) -> Option<&Getters> {
        self.duck(resource_type).map(|duck| duck.getters())
    }

    /// Builds the store actor and its client. The caller spawns
    /// [`StoreActor::run`].
    pub fn start(&self) -> (StoreActor, StoreClient) {
        StoreActor::new(
            self.settings.mailbox_size,
            self.reducer.clone(),
            self.epics.clone(),
        )
    }

    pub fn binding(&self, store: StoreClient, operations: Vec<OperationDescriptor>) -> ResourceBinding {
        ResourceBinding::new(store, operations)
    }

    /// Loads every resource type's custom getters through the configured
    /// loader. `true` when all of them loaded, or when there is no loader.
    pub async fn getters_loaded(&self) -> bool {
        let Some(loader) = &self.getter_loader else {
            return true;
        };
        join_all(
            self.ducks
                .values()
                .map(|duck| duck.getters().load(loader.as_ref())),
        )
        .await
        .into_iter()
        .all(|loaded| loaded)
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("resource_types", &self.names)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GetterLoadError;
    use crate::getters::CustomGetter;
    use crate::mock::MockDataManager;
    use crate::state::GlobalState;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn config() -> ResourcesConfig {
        ResourcesConfig::new()
            .resource_type("ANIMALS", "animals")
            .resource_type("USERS", "users")
            .data_manager("animals", MockDataManager::new())
            .data_manager("users", MockDataManager::new())
    }

    fn constant(value: Value) -> CustomGetter {
        Arc::new(move |_: &GlobalState, _: &Value| Some(value.clone()))
    }

    #[test]
    fn test_configure_builds_one_duck_per_resource_type() {
        let resources = configure(config()).unwrap();
        assert_eq!(resources.resource_types().len(), 2);
        assert_eq!(
            resources.resource_type("ANIMALS"),
            Some(&ResourceType::from("animals"))
        );

        let users = ResourceType::from("users");
        assert_eq!(
            resources.action_creators_of(&users).unwrap().resource_type(),
            &users
        );
        assert!(resources.getters_of(&users).is_some());
        assert!(resources.action_creators_of(&"plants".into()).is_none());

        let state = resources.reducer().initial_state();
        assert_eq!(state.resource_types().count(), 2);
    }

    #[test]
    fn test_configure_rejects_inconsistent_setups() {
        let missing = ResourcesConfig::new()
            .resource_type("ANIMALS", "animals")
            .resource_type("USERS", "users")
            .data_manager("animals", MockDataManager::new());
        assert_eq!(
            configure(missing).unwrap_err(),
            SetupError::MissingDataManager("users".into())
        );

        let undeclared = config().data_manager("plants", MockDataManager::new());
        assert_eq!(
            configure(undeclared).unwrap_err(),
            SetupError::UndeclaredResourceType("plants".into())
        );

        let duplicate = config().resource_type("PETS", "animals");
        assert_eq!(
            configure(duplicate).unwrap_err(),
            SetupError::DuplicateResourceType("animals".into())
        );

        let renamed = config().resource_type("ANIMALS", "plants");
        assert_eq!(
            configure(renamed).unwrap_err(),
            SetupError::DuplicateName("ANIMALS".to_string())
        );

        let settings = Settings {
            mailbox_size: 0,
            ..Settings::default()
        };
        assert!(matches!(
            configure(config().settings(settings)).unwrap_err(),
            SetupError::InvalidSettings(_)
        ));

        let getters = config().getters("plants", GetterSet::new());
        assert_eq!(
            configure(getters).unwrap_err(),
            SetupError::UndeclaredResourceType("plants".into())
        );
    }

    #[test]
    fn test_settings_reach_the_memoizer() {
        let settings = Settings {
            cache_timeout_ms: None,
            ..Settings::default()
        };
        let resources = configure(config().settings(settings)).unwrap();
        let duck = resources.duck(&"animals".into()).unwrap();
        assert_eq!(duck.fetch().timeout(), None);
    }

    #[test]
    fn test_registered_getters_are_available() {
        let set = GetterSet::from([("answer".to_string(), constant(json!(42)))]);
        let resources = configure(config().getters("users", set)).unwrap();
        let getters = resources.getters_of(&"users".into()).unwrap();
        assert!(getters.has("answer"));
        assert_eq!(
            getters.get("answer", &resources.reducer().initial_state(), &Value::Null),
            Some(json!(42))
        );
    }

    struct FlakyLoader;

    #[async_trait]
    impl GetterLoader for FlakyLoader {
        async fn load(&self, resource_type: &ResourceType) -> Result<GetterSet, GetterLoadError> {
            match resource_type.as_str() {
                "animals" => Ok(GetterSet::from([("zoo".to_string(), constant(json!("open")))])),
                _ => Err(GetterLoadError::NotFound(resource_type.clone())),
            }
        }
    }

    #[tokio::test]
    async fn test_getters_loaded() {
        let resources = configure(config()).unwrap();
        assert!(resources.getters_loaded().await);

        let resources = configure(config().getter_loader(FlakyLoader)).unwrap();
        assert!(!resources.getters_loaded().await);
        assert!(resources.getters_of(&"animals".into()).unwrap().has("zoo"));
        assert!(resources.getters_of(&"animals".into()).unwrap().is_loaded());
        assert!(!resources.getters_of(&"users".into()).unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_started_store_serves_initial_state() {
        let resources = configure(config()).unwrap();
        let (store, client) = resources.start();
        let handle = tokio::spawn(store.run());

        let state = client.get_state().await.unwrap();
        assert!(state.resource(&"animals".into()).is_some());

        drop(client);
        handle.await.unwrap();
    }
}
