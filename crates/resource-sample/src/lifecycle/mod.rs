//! # System Lifecycle & Orchestration
//!
//! [`ResourceSystem`] is the "conductor" of the sample: it configures the
//! engine with the sample data managers and getters, starts the store actor
//! and hands out typed clients and bindings.
//!
//! ## Graceful Shutdown
//!
//! The store actor stops once every [`StoreClient`] is gone:
//!
//! 1. **Unmount bindings** - their deregistrations are still applied
//! 2. **Drop all clients** - closes the sender side of the mailbox
//! 3. **Await completion** - the actor logs `Shutdown` and its task ends
//!
//! In-flight fetches only hold weak senders and never keep the store alive.

use crate::clients::{AnimalClient, UserClient};
use crate::getters::SampleGetterLoader;
use crate::managers;
use crate::model::{ANIMALS, USERS};
use tokio::task::JoinHandle;
use tracing::info;
use with_resources::{
    configure, OperationDescriptor, ResourceBinding, Resources, ResourcesConfig, SetupError,
    Settings, StoreClient,
};

pub struct ResourceSystem {
    pub resources: Resources,
    pub store: StoreClient,
    pub animal_client: AnimalClient,
    pub user_client: UserClient,
    handles: Vec<JoinHandle<()>>,
}

impl ResourceSystem {
    /// Starts the sample system with its in-process data managers.
    pub fn new(settings: Settings) -> Result<Self, SetupError> {
        Self::from_config(
            Self::config(settings)
                .data_manager(ANIMALS, managers::animals())
                .data_manager(USERS, managers::users()),
        )
    }

    /// The sample resource types and getters, without data managers.
    pub fn config(settings: Settings) -> ResourcesConfig {
        ResourcesConfig::new()
            .settings(settings)
            .resource_type("ANIMALS", ANIMALS)
            .resource_type("USERS", USERS)
            .getter_loader(SampleGetterLoader)
    }

    /// Starts a system from any configuration, e.g. one carrying mock data
    /// managers.
    pub fn from_config(config: ResourcesConfig) -> Result<Self, SetupError> {
        let resources = configure(config)?;
        let (store_actor, store) = resources.start();
        let handle = tokio::spawn(store_actor.run());
        info!(resource_types = ?resources.resource_types(), "Resource system started");

        Ok(Self {
            animal_client: AnimalClient::new(store.clone()),
            user_client: UserClient::new(store.clone()),
            store,
            resources,
            handles: vec![handle],
        })
    }

    pub fn binding(&self, operations: Vec<OperationDescriptor>) -> ResourceBinding {
        self.resources.binding(self.store.clone(), operations)
    }

    /// Drops the system's clients and waits for the store to stop. Clients
    /// or bindings cloned out of the system must be gone as well.
    pub async fn shutdown(self) -> Result<(), String> {
        drop(self.animal_client);
        drop(self.user_client);
        drop(self.store);

        for handle in self.handles {
            handle.await.map_err(|e| e.to_string())?;
        }
        info!("Resource system stopped");
        Ok(())
    }
}
