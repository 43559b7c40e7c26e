//! Getters of the `animals` resource type.

use crate::model::{ANIMALS, RETRIEVE_ONE};
use serde_json::Value;
use std::sync::Arc;
use with_resources::{CustomGetter, GetterSet, GlobalState, ResourceType};

pub const GET_ANIMAL: &str = "getAnimal";

/// Shown while no picture has been retrieved successfully.
pub const DEFAULT_ANIMAL: &str = " ";

/// The picture retrieved for the input in `args`, or `default_value`
/// unless the last retrieval succeeded.
pub fn get_animal(default_value: &'static str) -> CustomGetter {
    let resource_type = ResourceType::from(ANIMALS);
    Arc::new(move |state: &GlobalState, args: &Value| {
        let image = state
            .get_operation(&resource_type, RETRIEVE_ONE, args)
            .filter(|operation| operation.status.success == Some(true))
            .and_then(|operation| operation.data.as_ref()?.get("image").cloned())
            .filter(|image| !image.is_null());
        Some(image.unwrap_or_else(|| Value::from(default_value)))
    })
}

pub fn getters() -> GetterSet {
    GetterSet::from([(GET_ANIMAL.to_string(), get_animal(DEFAULT_ANIMAL))])
}
