//! Serverless trigger messages (`yandex.cloud.serverless.triggers.v1`)

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire::{self, wire_enum};

wire_enum! {
    /// Log severity accepted by the logging rule
    pub enum LogLevel {
        Unspecified = "LEVEL_UNSPECIFIED",
        Trace = "TRACE",
        Debug = "DEBUG",
        Info = "INFO",
        Warn = "WARN",
        Error = "ERROR",
        Fatal = "FATAL",
    }
}

wire_enum! {
    pub enum ObjectStorageEventType {
        Unspecified = "OBJECT_STORAGE_EVENT_TYPE_UNSPECIFIED",
        CreateObject = "OBJECT_STORAGE_EVENT_TYPE_CREATE_OBJECT",
        UpdateObject = "OBJECT_STORAGE_EVENT_TYPE_UPDATE_OBJECT",
        DeleteObject = "OBJECT_STORAGE_EVENT_TYPE_DELETE_OBJECT",
    }
}

wire_enum! {
    pub enum TriggerStatus {
        Unspecified = "STATUS_UNSPECIFIED",
        Active = "ACTIVE",
        Paused = "PAUSED",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    #[serde(default)]
    pub folder_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub status: TriggerStatus,
}

/// Event source of a trigger. Exactly one is set on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    IotMessage(IotMessage),
    MessageQueue(MessageQueue),
    ObjectStorage(ObjectStorage),
    Timer(Timer),
    CloudLogs(CloudLogs),
    Logging(Logging),
}

impl Rule {
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::IotMessage(_) => "iot",
            Rule::MessageQueue(_) => "message_queue",
            Rule::ObjectStorage(_) => "object_storage",
            Rule::Timer(_) => "timer",
            Rule::CloudLogs(_) => "log_group",
            Rule::Logging(_) => "logging",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IotMessage {
    pub registry_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mqtt_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_function: Option<InvokeFunctionWithRetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQueue {
    pub queue_id: String,
    #[serde(default)]
    pub service_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_settings: Option<BatchSettings>,
    #[serde(default, with = "wire::duration", skip_serializing_if = "Option::is_none")]
    pub visibility_timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_function: Option<InvokeFunctionOnce>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorage {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_type: Vec<ObjectStorageEventType>,
    pub bucket_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_function: Option<InvokeFunctionWithRetry>,
}

/// Timer is the only rule whose action shape varies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub cron_expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_function: Option<InvokeFunctionOnce>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_function_with_retry: Option<InvokeFunctionWithRetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudLogs {
    #[serde(default)]
    pub log_group_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_settings: Option<BatchSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_function: Option<InvokeFunctionWithRetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Logging {
    #[serde(default)]
    pub log_group_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_settings: Option<BatchSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_function: Option<InvokeFunctionWithRetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeFunctionOnce {
    pub function_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub function_tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeFunctionWithRetry {
    pub function_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub function_tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_settings: Option<RetrySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_queue: Option<PutQueueMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    #[serde(default, with = "wire::int64")]
    pub retry_attempts: i64,
    #[serde(default, with = "wire::duration", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,
}

/// Dead-letter queue target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutQueueMessage {
    #[serde(default)]
    pub queue_id: String,
    #[serde(default)]
    pub service_account_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSettings {
    #[serde(default, with = "wire::int64")]
    pub size: i64,
    #[serde(default, with = "wire::duration", skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTriggerRequest {
    pub folder_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub rule: Rule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTriggerRequest {
    /// Carried in the URL path
    #[serde(skip)]
    pub trigger_id: String,
    #[serde(with = "wire::field_mask")]
    pub update_mask: Vec<String>,
    pub name: String,
    pub description: String,
    pub labels: BTreeMap<String, String>,
}
