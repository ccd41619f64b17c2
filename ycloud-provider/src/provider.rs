//! Yandex Cloud provider implementation
//!
//! Lifecycle of `function_trigger` and lookup of `kubernetes_node_group`
//! on top of a `CloudApi`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use ycloud_core::differ::find_changed_attributes;
use ycloud_core::provider::{ProviderError, ProviderResult};
use ycloud_core::resource::{Resource, ResourceId, State, Value};
use ycloud_core::schema::ResourceSchema;

use crate::api::operation::{Operation, wait_operation};
use crate::api::rest::RestClient;
use crate::api::triggers::UpdateTriggerRequest;
use crate::api::{ApiResult, CloudApi};
use crate::config::ProviderConfig;
use crate::node_group::{NodeGroupLookup, flatten_node_group};
use crate::schemas::{function_trigger, kubernetes_node_group};
use crate::trigger::{TriggerConfig, expand_create_request, flatten_trigger};
use crate::utils::filter_eq;

/// Trigger attributes that can change without replacing the trigger
const MUTABLE_TRIGGER_FIELDS: [&str; 3] = ["name", "description", "labels"];

/// Yandex Cloud Provider
pub struct YandexProvider {
    api: Arc<dyn CloudApi>,
    config: ProviderConfig,
}

impl YandexProvider {
    /// Create a provider talking to the public REST endpoints
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = RestClient::new(&config)?;
        Ok(Self::with_api(Arc::new(client), config))
    }

    /// Create a provider on top of an arbitrary `CloudApi`
    pub fn with_api(api: Arc<dyn CloudApi>, config: ProviderConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn wait(&self, op: Operation, timeout: Duration) -> ApiResult<Operation> {
        wait_operation(self.api.as_ref(), op, self.config.poll_interval, timeout).await
    }

    /// Folder from the resource, falling back to the provider default
    fn folder_id(&self, configured: Option<&str>) -> ProviderResult<String> {
        configured
            .or(self.config.folder_id.as_deref())
            .filter(|f| !f.is_empty())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::validation(
                    "folder_id is not set and the provider has no default folder (YC_FOLDER_ID)",
                )
            })
    }

    // =========================================================================
    // Function triggers
    // =========================================================================

    /// Read a trigger by id
    pub async fn read_trigger(&self, id: &ResourceId, trigger_id: &str) -> ProviderResult<State> {
        let trigger = match self.api.get_trigger(trigger_id).await {
            Ok(trigger) => trigger,
            Err(e) if e.is_not_found() => {
                info!("Trigger {} not found, removing {} from state", trigger_id, id);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => return Err(ProviderError::from(e).for_resource(id.clone())),
        };

        let config = flatten_trigger(&trigger)
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
        Ok(State::existing(id.clone(), config.to_attributes()).with_identifier(trigger.id))
    }

    /// Create a trigger and wait until it exists
    pub async fn create_trigger(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let config = validated_trigger(resource)?;
        let folder_id = self
            .folder_id(config.folder_id.as_deref())
            .map_err(|e| e.for_resource(id.clone()))?;
        let request = expand_create_request(&config, &folder_id)
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;

        debug!(
            "Creating {} trigger {} in folder {}",
            request.rule.kind(),
            config.name,
            folder_id
        );
        let op = self
            .api
            .create_trigger(&request)
            .await
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
        let trigger_id = op.metadata_str("triggerId").map(String::from).ok_or_else(|| {
            ProviderError::new(format!(
                "create operation {} did not report a trigger id",
                op.id
            ))
            .for_resource(id.clone())
        })?;

        self.wait(op, self.config.timeouts.create)
            .await
            .map_err(|e| {
                let err = ProviderError::from(e);
                ProviderError::new(format!(
                    "error while waiting for trigger {} creation: {}",
                    trigger_id, err.message
                ))
                .with_kind(err.kind)
                .with_cause(err)
                .for_resource(id.clone())
            })?;
        info!("Created trigger {} ({})", trigger_id, id);

        self.read_trigger(id, &trigger_id).await
    }

    /// Update name, description and labels in place
    pub async fn update_trigger(
        &self,
        id: &ResourceId,
        trigger_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let config = validated_trigger(to)?;
        let desired = config.to_attributes();
        let schema = function_trigger::function_trigger_schema();

        let changed = find_changed_attributes(&desired, &from.attributes, Some(&schema));
        let replace = schema.force_new_attributes(&changed);
        if !replace.is_empty() {
            return Err(ProviderError::validation(format!(
                "changing {} requires replacement of trigger {}",
                replace.join(", "),
                trigger_id
            ))
            .for_resource(id.clone()));
        }

        let update_mask: Vec<String> = changed
            .into_iter()
            .filter(|name| MUTABLE_TRIGGER_FIELDS.contains(&name.as_str()))
            .collect();
        if update_mask.is_empty() {
            debug!("Trigger {} has no changes", trigger_id);
            return self.read_trigger(id, trigger_id).await;
        }

        debug!("Updating trigger {} ({})", trigger_id, update_mask.join(","));
        let request = UpdateTriggerRequest {
            trigger_id: trigger_id.to_string(),
            update_mask,
            name: config.name,
            description: config.description,
            labels: config.labels,
        };
        let op = self
            .api
            .update_trigger(&request)
            .await
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
        self.wait(op, self.config.timeouts.update)
            .await
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
        info!("Updated trigger {} ({})", trigger_id, id);

        self.read_trigger(id, trigger_id).await
    }

    /// Delete a trigger; a trigger that is already gone counts as deleted
    pub async fn delete_trigger(&self, id: &ResourceId, trigger_id: &str) -> ProviderResult<()> {
        let result = match self.api.delete_trigger(trigger_id).await {
            Ok(op) => self.wait(op, self.config.timeouts.delete).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Deleted trigger {} ({})", trigger_id, id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!("Trigger {} was already deleted", trigger_id);
                Ok(())
            }
            Err(e) => Err(ProviderError::from(e).for_resource(id.clone())),
        }
    }

    // =========================================================================
    // Kubernetes node groups
    // =========================================================================

    /// Look a node group up by id or by name
    pub async fn read_node_group(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let lookup = NodeGroupLookup::from_attributes(&resource.attributes)
            .map_err(|e| e.for_resource(id.clone()))?;
        validate(&kubernetes_node_group::kubernetes_node_group_schema(), resource)?;

        let (node_group_id, folder_id) = match lookup {
            NodeGroupLookup::ById(node_group_id) => {
                let folder_id = resource
                    .attributes
                    .get("folder_id")
                    .and_then(|v| v.as_str())
                    .map(String::from);
                (node_group_id, folder_id)
            }
            NodeGroupLookup::ByName { name, folder_id } => {
                let folder_id = self
                    .folder_id(folder_id.as_deref())
                    .map_err(|e| e.for_resource(id.clone()))?;
                match self.resolve_node_group_name(&folder_id, &name).await {
                    Ok(Some(node_group_id)) => (node_group_id, Some(folder_id)),
                    Ok(None) => {
                        info!("Node group {} not found in folder {}", name, folder_id);
                        return Ok(State::not_found(id.clone()));
                    }
                    Err(e) => return Err(e.for_resource(id.clone())),
                }
            }
        };

        let node_group = match self.api.get_node_group(&node_group_id).await {
            Ok(ng) => ng,
            Err(e) if e.is_not_found() => {
                info!("Node group {} not found", node_group_id);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => return Err(ProviderError::from(e).for_resource(id.clone())),
        };

        let mut attributes = flatten_node_group(&node_group);
        if let Some(folder_id) = folder_id.filter(|f| !f.is_empty()) {
            attributes.insert("folder_id".to_string(), Value::from(folder_id));
        }
        Ok(State::existing(id.clone(), attributes).with_identifier(node_group.id))
    }

    async fn resolve_node_group_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> ProviderResult<Option<String>> {
        let matches = self
            .api
            .list_node_groups(folder_id, &filter_eq("name", name))
            .await
            .map_err(ProviderError::from)?;

        match matches.as_slice() {
            [] => Ok(None),
            [ng] => Ok(Some(ng.id.clone())),
            many => {
                let ids: BTreeSet<&str> = many.iter().map(|ng| ng.id.as_str()).collect();
                Err(ProviderError::new(format!(
                    "multiple node groups named {} in folder {}: {}",
                    name,
                    folder_id,
                    ids.into_iter().collect::<Vec<_>>().join(", ")
                )))
            }
        }
    }
}

/// Check the attribute tree against a schema
fn validate(schema: &ResourceSchema, resource: &Resource) -> ProviderResult<()> {
    schema.validate(&resource.attributes).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ProviderError::validation(messages.join("; ")).for_resource(resource.id.clone())
    })
}

fn validated_trigger(resource: &Resource) -> ProviderResult<TriggerConfig> {
    validate(&function_trigger::function_trigger_schema(), resource)?;
    TriggerConfig::from_attributes(&resource.attributes)
        .map_err(|e| ProviderError::from(e).for_resource(resource.id.clone()))
}
