//! Yandex Cloud API surface used by the provider
//!
//! - `wire` - proto3 JSON encoding helpers
//! - `triggers` / `k8s` / `operation` - request and response messages
//! - `rest` - `CloudApi` over the public REST endpoints

pub mod k8s;
pub mod operation;
pub mod rest;
#[cfg(test)]
pub(crate) mod testing;
pub mod triggers;
pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use ycloud_core::provider::{ErrorKind, ProviderError};

use k8s::NodeGroup;
use operation::Operation;
use triggers::{CreateTriggerRequest, Trigger, UpdateTriggerRequest};

/// gRPC status code NOT_FOUND
const CODE_NOT_FOUND: i32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("API returned {status}: {message}")]
    Status {
        status: u16,
        code: i32,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Operation {id} failed (code {code}): {message}")]
    OperationFailed {
        id: String,
        code: i32,
        message: String,
    },

    #[error("Operation {id} did not finish within {timeout:?}")]
    Timeout { id: String, timeout: Duration },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::NotFound(_) => true,
            ApiError::Status { status, code, .. } => *status == 404 || *code == CODE_NOT_FOUND,
            ApiError::OperationFailed { code, .. } => *code == CODE_NOT_FOUND,
            _ => false,
        }
    }

    fn kind(&self) -> ErrorKind {
        if self.is_not_found() {
            return ErrorKind::NotFound;
        }
        match self {
            ApiError::OperationFailed { .. } => ErrorKind::Operation,
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::Configuration(_) => ErrorKind::Validation,
            _ => ErrorKind::Api,
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(e: ApiError) -> Self {
        ProviderError::new(e.to_string())
            .with_kind(e.kind())
            .with_cause(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Calls the provider makes against Yandex Cloud
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn get_trigger(&self, trigger_id: &str) -> ApiResult<Trigger>;

    async fn create_trigger(&self, request: &CreateTriggerRequest) -> ApiResult<Operation>;

    async fn update_trigger(&self, request: &UpdateTriggerRequest) -> ApiResult<Operation>;

    async fn delete_trigger(&self, trigger_id: &str) -> ApiResult<Operation>;

    async fn get_node_group(&self, node_group_id: &str) -> ApiResult<NodeGroup>;

    /// List node groups of a folder matching `filter` (e.g. `name="workers"`)
    async fn list_node_groups(&self, folder_id: &str, filter: &str) -> ApiResult<Vec<NodeGroup>>;

    async fn get_operation(&self, operation_id: &str) -> ApiResult<Operation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_detection() {
        assert!(ApiError::NotFound("trigger a1".into()).is_not_found());
        assert!(
            ApiError::Status {
                status: 404,
                code: 0,
                message: String::new()
            }
            .is_not_found()
        );
        assert!(
            ApiError::OperationFailed {
                id: "op".into(),
                code: 5,
                message: "gone".into()
            }
            .is_not_found()
        );
        assert!(!ApiError::Transport("reset".into()).is_not_found());
    }

    #[test]
    fn provider_error_kinds() {
        let err: ProviderError = ApiError::Timeout {
            id: "op1".into(),
            timeout: Duration::from_secs(1),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Timeout);

        let err: ProviderError = ApiError::OperationFailed {
            id: "op1".into(),
            code: 9,
            message: "quota".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Operation);
        assert!(err.to_string().contains("quota"));
    }
}
