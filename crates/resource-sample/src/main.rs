//! # With Resources Demo
//!
//! ## 📚 Quick Start
//!
//! The entry point demonstrates:
//! 1.  Starting the [`ResourceSystem`].
//! 2.  Mounting a binding on the users directory and watching its status.
//! 3.  Retrieving animal pictures through the typed client, cached and fresh.
//!
//! ## 🧪 Testing
//!
//! See [`with_resources::mock`] for utilities to test without real backends.

use resource_sample::clients::AnimalClient;
use resource_sample::getters::animals::GET_ANIMAL;
use resource_sample::lifecycle::ResourceSystem;
use resource_sample::model::ANIMALS;
use tracing::{error, info, Instrument};
use with_resources::tracing::setup_tracing;
use with_resources::{OperationDescriptor, OperationOptions, ResourceClient, Settings};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let settings = Settings::default()
        .with_env_overrides()
        .map_err(|e| e.to_string())?;
    info!(?settings, "Starting resource demo");

    let system = ResourceSystem::new(settings).map_err(|e| e.to_string())?;
    if !system.resources.getters_loaded().await {
        error!("Some getters failed to load");
    }

    let span = tracing::info_span!("users_binding");
    async {
        let users = resource_sample::clients::UserClient::cargo(1, 10);
        let descriptor = OperationDescriptor::new(
            "users",
            users.method.clone(),
            users.input.clone(),
        )
        .with_options(OperationOptions {
            autorun: true,
            reset_on_last_deregister: true,
            ..OperationOptions::default()
        });

        let mut binding = system.binding(vec![descriptor]);
        binding.mount().await.map_err(|e| e.to_string())?;
        info!(status = ?binding.status(), "Binding mounted");
        while binding.status().loading != Some(false) {
            binding.changed().await.map_err(|e| e.to_string())?;
        }
        info!(status = ?binding.status(), "Users loaded");
        binding.unmount().await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("animals");
    async {
        for kind in ["fox", "cat", "fox"] {
            match system.animal_client.retrieve_one(kind).await {
                Ok(image) => info!(kind, image = %image, "Animal retrieved"),
                Err(e) => error!(kind, error = %e, "Animal retrieval failed"),
            }
        }

        let getters = system.resources.getters_of(&ANIMALS.into());
        let fox = AnimalClient::cargo("fox").input;
        let image = getters.and_then(|getters| getters.get(GET_ANIMAL, &system.store.state(), &fox));
        info!(?image, "Fox from getter");

        if let Err(e) = system.animal_client.clear_cache(None).await {
            error!(error = %e, "Cache clear failed");
        }
        match system.animal_client.retrieve_one("fox").await {
            Ok(image) => info!(image = %image, "Fresh fox retrieved"),
            Err(e) => error!(error = %e, "Animal retrieval failed"),
        }
    }
    .instrument(span)
    .await;

    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
