//! `CloudApi` over the public Yandex Cloud REST endpoints

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::k8s::{ListNodeGroupsResponse, NodeGroup};
use super::operation::{Operation, Status};
use super::triggers::{CreateTriggerRequest, Trigger, UpdateTriggerRequest};
use super::{ApiError, ApiResult, CloudApi};
use crate::config::{Endpoints, ProviderConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const PAGE_SIZE: &str = "1000";

pub struct RestClient {
    client: Client,
    token: String,
    endpoints: Endpoints,
}

impl RestClient {
    pub fn new(config: &ProviderConfig) -> ApiResult<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| ApiError::Configuration("YC_TOKEN is not set".to_string()))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token,
            endpoints: config.endpoints.clone(),
        })
    }

    fn triggers_url(&self) -> String {
        format!(
            "{}/triggers/v1/triggers",
            self.endpoints.triggers.trim_end_matches('/')
        )
    }

    fn trigger_url(&self, trigger_id: &str) -> String {
        format!("{}/{}", self.triggers_url(), trigger_id)
    }

    fn node_groups_url(&self) -> String {
        format!(
            "{}/managed-kubernetes/v1/nodeGroups",
            self.endpoints.kubernetes.trim_end_matches('/')
        )
    }

    fn operation_url(&self, operation_id: &str) -> String {
        format!(
            "{}/operations/{}",
            self.endpoints.operations.trim_end_matches('/'),
            operation_id
        )
    }

    async fn send<T: DeserializeOwned>(&self, what: &str, request: RequestBuilder) -> ApiResult<T> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!("{} -> {}", what, status);

        if !status.is_success() {
            return Err(error_from_response(what, status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{}: {}", what, e)))
    }
}

/// Map a non-success REST response to an error
///
/// Error bodies carry a `google.rpc.Status`; a 404 or NOT_FOUND code becomes
/// `ApiError::NotFound`.
pub fn error_from_response(what: &str, status: u16, body: &str) -> ApiError {
    let rpc: Status = serde_json::from_str(body).unwrap_or_else(|_| Status {
        message: body.trim().to_string(),
        ..Default::default()
    });

    let err = ApiError::Status {
        status,
        code: rpc.code,
        message: rpc.message,
    };
    if err.is_not_found() {
        ApiError::NotFound(what.to_string())
    } else {
        err
    }
}

#[async_trait]
impl CloudApi for RestClient {
    async fn get_trigger(&self, trigger_id: &str) -> ApiResult<Trigger> {
        let what = format!("trigger {}", trigger_id);
        self.send(&what, self.client.get(self.trigger_url(trigger_id)))
            .await
    }

    async fn create_trigger(&self, request: &CreateTriggerRequest) -> ApiResult<Operation> {
        let what = format!("create trigger {}", request.name);
        self.send(&what, self.client.post(self.triggers_url()).json(request))
            .await
    }

    async fn update_trigger(&self, request: &UpdateTriggerRequest) -> ApiResult<Operation> {
        let what = format!("trigger {}", request.trigger_id);
        self.send(
            &what,
            self.client
                .patch(self.trigger_url(&request.trigger_id))
                .json(request),
        )
        .await
    }

    async fn delete_trigger(&self, trigger_id: &str) -> ApiResult<Operation> {
        let what = format!("trigger {}", trigger_id);
        self.send(&what, self.client.delete(self.trigger_url(trigger_id)))
            .await
    }

    async fn get_node_group(&self, node_group_id: &str) -> ApiResult<NodeGroup> {
        let what = format!("node group {}", node_group_id);
        let url = format!("{}/{}", self.node_groups_url(), node_group_id);
        self.send(&what, self.client.get(url)).await
    }

    async fn list_node_groups(&self, folder_id: &str, filter: &str) -> ApiResult<Vec<NodeGroup>> {
        let what = format!("node groups in folder {}", folder_id);
        let mut node_groups = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut query = vec![
                ("folderId", folder_id),
                ("filter", filter),
                ("pageSize", PAGE_SIZE),
            ];
            if !page_token.is_empty() {
                query.push(("pageToken", page_token.as_str()));
            }
            let page: ListNodeGroupsResponse = self
                .send(&what, self.client.get(self.node_groups_url()).query(&query))
                .await?;

            node_groups.extend(page.node_groups);
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }

        Ok(node_groups)
    }

    async fn get_operation(&self, operation_id: &str) -> ApiResult<Operation> {
        let what = format!("operation {}", operation_id);
        self.send(&what, self.client.get(self.operation_url(operation_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RestClient {
        let config = ProviderConfig::default()
            .with_token("t1")
            .with_endpoints(Endpoints {
                triggers: "http://triggers.local/".to_string(),
                operations: "http://operations.local".to_string(),
                kubernetes: "http://mks.local".to_string(),
            });
        RestClient::new(&config).unwrap()
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let result = RestClient::new(&ProviderConfig::default());
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    fn urls() {
        let c = client();
        assert_eq!(
            c.trigger_url("a1s"),
            "http://triggers.local/triggers/v1/triggers/a1s"
        );
        assert_eq!(c.operation_url("op1"), "http://operations.local/operations/op1");
        assert_eq!(
            c.node_groups_url(),
            "http://mks.local/managed-kubernetes/v1/nodeGroups"
        );
    }

    #[test]
    fn error_mapping() {
        let err = error_from_response(
            "trigger a1s",
            404,
            r#"{"code": 5, "message": "Trigger a1s not found"}"#,
        );
        assert!(matches!(err, ApiError::NotFound(ref what) if what == "trigger a1s"));

        let err = error_from_response("trigger a1s", 400, r#"{"code": 3, "message": "bad cron"}"#);
        match err {
            ApiError::Status {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, 3);
                assert_eq!(message, "bad cron");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = error_from_response("trigger a1s", 502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "API returned 502: Bad Gateway");
    }
}
