//! In-memory `CloudApi` for tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;

use super::k8s::NodeGroup;
use super::operation::{Operation, Status};
use super::triggers::{CreateTriggerRequest, Trigger, TriggerStatus, UpdateTriggerRequest};
use super::{ApiError, ApiResult, CloudApi};
use crate::utils::filter_eq;

#[derive(Default)]
pub(crate) struct MockState {
    pub triggers: BTreeMap<String, Trigger>,
    /// (folder id, node group)
    pub node_groups: Vec<(String, NodeGroup)>,
    /// Responses handed out by `get_operation` before the final one
    pub scripted: HashMap<String, VecDeque<Operation>>,
    /// Final state of every operation started through the mock
    pub operations: HashMap<String, Operation>,
    /// Mutating calls return operations that are not done yet
    pub pending: bool,
    /// The next mutating call fails with this status once polled
    pub fail_next: Option<Status>,
    pub creates: Vec<CreateTriggerRequest>,
    pub updates: Vec<UpdateTriggerRequest>,
    pub deletes: Vec<String>,
    pub list_calls: Vec<(String, String)>,
    pub polls: usize,
    next_id: usize,
}

#[derive(Default)]
pub(crate) struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn add_node_group(&self, folder_id: &str, node_group: NodeGroup) {
        self.state()
            .node_groups
            .push((folder_id.to_string(), node_group));
    }

    pub fn add_trigger(&self, trigger: Trigger) {
        self.state().triggers.insert(trigger.id.clone(), trigger);
    }
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    /// Record the final state of a new operation and return what the
    /// mutating call hands back
    fn start(&mut self, metadata: Option<serde_json::Value>) -> (Operation, bool) {
        let error = self.fail_next.take();
        let failed = error.is_some();
        let op = Operation {
            id: self.next_id("op-"),
            done: true,
            metadata,
            error,
            ..Default::default()
        };
        self.operations.insert(op.id.clone(), op.clone());
        let returned = Operation {
            done: !self.pending,
            error: if self.pending { None } else { op.error },
            ..op
        };
        (returned, failed)
    }
}

#[async_trait]
impl CloudApi for MockApi {
    async fn get_trigger(&self, trigger_id: &str) -> ApiResult<Trigger> {
        self.state()
            .triggers
            .get(trigger_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("trigger {}", trigger_id)))
    }

    async fn create_trigger(&self, request: &CreateTriggerRequest) -> ApiResult<Operation> {
        let mut state = self.state();
        state.creates.push(request.clone());
        let id = state.next_id("a1s");
        let (op, failed) = state.start(Some(json!({ "triggerId": id })));
        if !failed {
            let trigger = Trigger {
                id: id.clone(),
                folder_id: request.folder_id.clone(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).single(),
                name: request.name.clone(),
                description: request.description.clone(),
                labels: request.labels.clone(),
                rule: Some(request.rule.clone()),
                status: TriggerStatus::Active,
            };
            state.triggers.insert(id, trigger);
        }
        Ok(op)
    }

    async fn update_trigger(&self, request: &UpdateTriggerRequest) -> ApiResult<Operation> {
        let mut state = self.state();
        state.updates.push(request.clone());
        let Some(trigger) = state.triggers.get_mut(&request.trigger_id) else {
            return Err(ApiError::NotFound(format!("trigger {}", request.trigger_id)));
        };
        for path in &request.update_mask {
            match path.as_str() {
                "name" => trigger.name = request.name.clone(),
                "description" => trigger.description = request.description.clone(),
                "labels" => trigger.labels = request.labels.clone(),
                _ => {}
            }
        }
        let metadata = json!({ "triggerId": request.trigger_id });
        Ok(state.start(Some(metadata)).0)
    }

    async fn delete_trigger(&self, trigger_id: &str) -> ApiResult<Operation> {
        let mut state = self.state();
        state.deletes.push(trigger_id.to_string());
        if state.triggers.remove(trigger_id).is_none() {
            return Err(ApiError::NotFound(format!("trigger {}", trigger_id)));
        }
        Ok(state.start(None).0)
    }

    async fn get_node_group(&self, node_group_id: &str) -> ApiResult<NodeGroup> {
        self.state()
            .node_groups
            .iter()
            .map(|(_, ng)| ng)
            .find(|ng| ng.id == node_group_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("node group {}", node_group_id)))
    }

    async fn list_node_groups(&self, folder_id: &str, filter: &str) -> ApiResult<Vec<NodeGroup>> {
        let mut state = self.state();
        state
            .list_calls
            .push((folder_id.to_string(), filter.to_string()));
        Ok(state
            .node_groups
            .iter()
            .filter(|(folder, ng)| folder == folder_id && filter_eq("name", &ng.name) == filter)
            .map(|(_, ng)| ng.clone())
            .collect())
    }

    async fn get_operation(&self, operation_id: &str) -> ApiResult<Operation> {
        let mut state = self.state();
        state.polls += 1;
        if let Some(queue) = state.scripted.get_mut(operation_id)
            && let Some(op) = queue.pop_front()
        {
            return Ok(op);
        }
        state
            .operations
            .get(operation_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("operation {}", operation_id)))
    }
}
