//! Provider configuration
//!
//! Settings come from the environment and can be overridden with the builder
//! methods:
//!
//! | variable                  | meaning                               |
//! |---------------------------|---------------------------------------|
//! | `YC_TOKEN`                | IAM token sent as a bearer token      |
//! | `YC_FOLDER_ID`            | default folder for new objects        |
//! | `YC_ENDPOINT_TRIGGERS`    | serverless triggers API base URL      |
//! | `YC_ENDPOINT_OPERATIONS`  | operation API base URL                |
//! | `YC_ENDPOINT_KUBERNETES`  | managed Kubernetes API base URL       |
//! | `YC_POLL_INTERVAL_SECS`   | delay between operation polls         |

use std::time::Duration;

use crate::api::ApiError;

pub const DEFAULT_TRIGGERS_ENDPOINT: &str = "https://serverless-triggers.api.cloud.yandex.net";
pub const DEFAULT_OPERATIONS_ENDPOINT: &str = "https://operation.api.cloud.yandex.net";
pub const DEFAULT_KUBERNETES_ENDPOINT: &str = "https://mks.api.cloud.yandex.net";

/// Default create/update/delete timeout of a trigger
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub triggers: String,
    pub operations: String,
    pub kubernetes: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            triggers: DEFAULT_TRIGGERS_ENDPOINT.to_string(),
            operations: DEFAULT_OPERATIONS_ENDPOINT.to_string(),
            kubernetes: DEFAULT_KUBERNETES_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub endpoints: Endpoints,
    pub token: Option<String>,
    pub folder_id: Option<String>,
    pub timeouts: Timeouts,
    pub poll_interval: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            token: None,
            folder_id: None,
            timeouts: Timeouts::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ProviderConfig {
    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.token = get("YC_TOKEN");
        config.folder_id = get("YC_FOLDER_ID");
        if let Some(url) = get("YC_ENDPOINT_TRIGGERS") {
            config.endpoints.triggers = url;
        }
        if let Some(url) = get("YC_ENDPOINT_OPERATIONS") {
            config.endpoints.operations = url;
        }
        if let Some(url) = get("YC_ENDPOINT_KUBERNETES") {
            config.endpoints.kubernetes = url;
        }
        if let Some(secs) = get("YC_POLL_INTERVAL_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ApiError::Configuration(format!(
                    "YC_POLL_INTERVAL_SECS must be a number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.poll_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ProviderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.timeouts.create, Duration::from_secs(300));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn environment_overrides() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("YC_TOKEN", "t1.secret"),
            ("YC_FOLDER_ID", "b1gfolder"),
            ("YC_ENDPOINT_TRIGGERS", "http://localhost:8080"),
            ("YC_POLL_INTERVAL_SECS", "1"),
            ("YC_ENDPOINT_KUBERNETES", "  "),
        ]))
        .unwrap();

        assert_eq!(config.token.as_deref(), Some("t1.secret"));
        assert_eq!(config.folder_id.as_deref(), Some("b1gfolder"));
        assert_eq!(config.endpoints.triggers, "http://localhost:8080");
        assert_eq!(config.endpoints.kubernetes, DEFAULT_KUBERNETES_ENDPOINT);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn invalid_poll_interval() {
        let err = ProviderConfig::from_lookup(lookup(&[("YC_POLL_INTERVAL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }
}
