//! Long-running operations (`yandex.cloud.operation`)

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, CloudApi};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

/// `google.rpc.Status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

impl Operation {
    /// Read a string field of the operation metadata (e.g. `triggerId`)
    pub fn metadata_str(&self, field: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(field))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Terminal result of a finished operation
    fn into_result(self) -> ApiResult<Operation> {
        match &self.error {
            Some(status) => Err(ApiError::OperationFailed {
                id: self.id.clone(),
                code: status.code,
                message: status.message.clone(),
            }),
            None => Ok(self),
        }
    }
}

/// Poll an operation until it is done or `timeout` elapses
pub async fn wait_operation(
    api: &dyn CloudApi,
    op: Operation,
    poll_interval: Duration,
    timeout: Duration,
) -> ApiResult<Operation> {
    if op.done {
        return op.into_result();
    }

    let id = op.id.clone();
    let poll = async {
        loop {
            tokio::time::sleep(poll_interval).await;
            let current = api.get_operation(&id).await?;
            if current.done {
                return current.into_result();
            }
            debug!("Operation {} still running", id);
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Timeout { id: op.id, timeout }),
    }
}
