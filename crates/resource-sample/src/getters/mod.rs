//! # Sample Getters
//!
//! Custom getters of the sample resource types, served through
//! [`SampleGetterLoader`] the way an application would load them lazily.

pub mod animals;

use crate::model::{ANIMALS, USERS};
use async_trait::async_trait;
use with_resources::{GetterLoadError, GetterLoader, GetterSet, ResourceType};

#[derive(Debug, Default, Clone, Copy)]
pub struct SampleGetterLoader;

#[async_trait]
impl GetterLoader for SampleGetterLoader {
    async fn load(&self, resource_type: &ResourceType) -> Result<GetterSet, GetterLoadError> {
        match resource_type.as_str() {
            ANIMALS => Ok(animals::getters()),
            USERS => Ok(GetterSet::new()),
            _ => Err(GetterLoadError::NotFound(resource_type.clone())),
        }
    }
}
