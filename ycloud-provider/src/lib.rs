//! ycloud Yandex Cloud Provider
//!
//! Yandex Cloud Provider implementation.
//!
//! ## Module Structure
//!
//! - `api` - Cloud API messages, the `CloudApi` trait and its REST client
//! - `config` - Endpoints, credentials and timeouts
//! - `trigger` - `function_trigger` attribute tree <-> API messages
//! - `node_group` - `kubernetes_node_group` lookup and projection
//! - `resources` - Resource type definitions
//! - `provider` - YandexProvider implementation
//! - `schemas` - Resource schemas
//! - `utils` - Unit and text conversion helpers

pub mod api;
pub mod config;
pub mod node_group;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod trigger;
pub mod utils;

// Re-export main types
pub use config::ProviderConfig;
pub use provider::YandexProvider;

use ycloud_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use ycloud_core::resource::{Resource, ResourceId, State};

use resources::{FUNCTION_TRIGGER, KUBERNETES_NODE_GROUP, resource_types};

fn unsupported(id: &ResourceId, operation: &str) -> ProviderError {
    ProviderError::new(format!(
        "{} is not supported for resource type {}",
        operation, id.resource_type
    ))
    .for_resource(id.clone())
}

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for YandexProvider {
    fn name(&self) -> &'static str {
        "yandex"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move {
            let Some(identifier) = identifier else {
                return Ok(State::not_found(id));
            };
            match id.resource_type.as_str() {
                FUNCTION_TRIGGER => self.read_trigger(&id, &identifier).await,
                KUBERNETES_NODE_GROUP => {
                    let resource = Resource::new(KUBERNETES_NODE_GROUP, id.name.clone())
                        .with_attribute("node_group_id", identifier.into())
                        .with_read_only(true);
                    self.read_node_group(&resource).await
                }
                _ => Err(unsupported(&id, "read")),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                FUNCTION_TRIGGER => self.create_trigger(&resource).await,
                _ => Err(unsupported(&resource.id, "create")),
            }
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            match id.resource_type.as_str() {
                FUNCTION_TRIGGER => self.update_trigger(&id, &identifier, &from, &to).await,
                _ => Err(unsupported(&id, "update")),
            }
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match id.resource_type.as_str() {
                FUNCTION_TRIGGER => self.delete_trigger(&id, &identifier).await,
                _ => Err(unsupported(&id, "delete")),
            }
        })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                KUBERNETES_NODE_GROUP => self.read_node_group(&resource).await,
                _ => Err(unsupported(&resource.id, "lookup")),
            }
        })
    }
}
