//! Trigger configuration -> wire request

use std::collections::BTreeSet;
use std::time::Duration;

use log::warn;

use super::{BatchConfig, RuleConfig, TriggerConfig, TriggerError};
use crate::api::triggers::{
    BatchSettings, CloudLogs, CreateTriggerRequest, InvokeFunctionOnce, InvokeFunctionWithRetry,
    IotMessage, LogLevel, Logging, MessageQueue, ObjectStorage, ObjectStorageEventType,
    PutQueueMessage, RetrySettings, Rule, Timer,
};

/// Build the create request for a trigger in `folder_id`
pub fn expand_create_request(
    config: &TriggerConfig,
    folder_id: &str,
) -> Result<CreateTriggerRequest, TriggerError> {
    Ok(CreateTriggerRequest {
        folder_id: folder_id.to_string(),
        name: config.name.clone(),
        description: config.description.clone(),
        labels: config.labels.clone(),
        rule: expand_rule(config)?,
    })
}

/// Build the wire rule of the configured event source
pub fn expand_rule(config: &TriggerConfig) -> Result<Rule, TriggerError> {
    let invoke = Invoke::new(config)?;

    let rule = match &config.rule {
        RuleConfig::Iot {
            registry_id,
            device_id,
            topic,
        } => Rule::IotMessage(IotMessage {
            registry_id: registry_id.clone(),
            device_id: device_id.clone().unwrap_or_default(),
            mqtt_topic: topic.clone().unwrap_or_default(),
            invoke_function: Some(invoke.with_retry()),
        }),

        RuleConfig::MessageQueue {
            queue_id,
            service_account_id,
            batch,
            visibility_timeout,
        } => Rule::MessageQueue(MessageQueue {
            queue_id: queue_id.clone(),
            service_account_id: service_account_id.clone(),
            batch_settings: expand_batch("message_queue", batch)?,
            visibility_timeout: visibility_timeout
                .as_deref()
                .map(|v| parse_seconds("message_queue.visibility_timeout", v))
                .transpose()?,
            invoke_function: Some(invoke.once()),
        }),

        RuleConfig::ObjectStorage {
            bucket_id,
            prefix,
            suffix,
            create,
            update,
            delete,
        } => {
            let event_type = [
                (*create, ObjectStorageEventType::CreateObject),
                (*update, ObjectStorageEventType::UpdateObject),
                (*delete, ObjectStorageEventType::DeleteObject),
            ]
            .into_iter()
            .filter_map(|(enabled, kind)| enabled.then_some(kind))
            .collect();

            Rule::ObjectStorage(ObjectStorage {
                event_type,
                bucket_id: bucket_id.clone(),
                prefix: prefix.clone().unwrap_or_default(),
                suffix: suffix.clone().unwrap_or_default(),
                invoke_function: Some(invoke.with_retry()),
            })
        }

        RuleConfig::Timer { cron_expression } => {
            let mut timer = Timer {
                cron_expression: cron_expression.clone(),
                ..Default::default()
            };
            if invoke.wants_retry() {
                timer.invoke_function_with_retry = Some(invoke.with_retry());
            } else {
                timer.invoke_function = Some(invoke.once());
            }
            Rule::Timer(timer)
        }

        RuleConfig::LogGroup {
            log_group_ids,
            batch,
        } => Rule::CloudLogs(CloudLogs {
            log_group_id: log_group_ids.iter().cloned().collect(),
            batch_settings: expand_batch("log_group", batch)?,
            invoke_function: Some(invoke.with_retry()),
        }),

        RuleConfig::Logging {
            group_id,
            resource_ids,
            resource_types,
            levels,
            batch,
        } => Rule::Logging(Logging {
            log_group_id: group_id.clone(),
            resource_type: resource_types.iter().cloned().collect(),
            resource_id: resource_ids.iter().cloned().collect(),
            levels: expand_levels(levels),
            batch_settings: expand_batch("logging", batch)?,
            invoke_function: Some(invoke.with_retry()),
        }),
    };

    Ok(rule)
}

/// Function invocation settings shared by every rule
struct Invoke {
    function_id: String,
    function_tag: String,
    service_account_id: String,
    retry_settings: Option<RetrySettings>,
    dead_letter_queue: Option<PutQueueMessage>,
}

impl Invoke {
    fn new(config: &TriggerConfig) -> Result<Self, TriggerError> {
        let function = &config.function;

        let retry_settings = if function.has_retry() {
            Some(RetrySettings {
                retry_attempts: function
                    .retry_attempts
                    .as_deref()
                    .map(|v| parse_int("function.retry_attempts", v))
                    .transpose()?
                    .unwrap_or_default(),
                interval: function
                    .retry_interval
                    .as_deref()
                    .map(|v| parse_seconds("function.retry_interval", v))
                    .transpose()?,
            })
        } else {
            None
        };

        Ok(Self {
            function_id: function.id.clone(),
            function_tag: function.tag.clone().unwrap_or_default(),
            service_account_id: function.service_account_id.clone().unwrap_or_default(),
            retry_settings,
            dead_letter_queue: config.dlq.as_ref().map(|dlq| PutQueueMessage {
                queue_id: dlq.queue_id.clone(),
                service_account_id: dlq.service_account_id.clone(),
            }),
        })
    }

    fn wants_retry(&self) -> bool {
        self.retry_settings.is_some() || self.dead_letter_queue.is_some()
    }

    fn once(&self) -> InvokeFunctionOnce {
        InvokeFunctionOnce {
            function_id: self.function_id.clone(),
            function_tag: self.function_tag.clone(),
            service_account_id: self.service_account_id.clone(),
        }
    }

    fn with_retry(&self) -> InvokeFunctionWithRetry {
        InvokeFunctionWithRetry {
            function_id: self.function_id.clone(),
            function_tag: self.function_tag.clone(),
            service_account_id: self.service_account_id.clone(),
            retry_settings: self.retry_settings.clone(),
            dead_letter_queue: self.dead_letter_queue.clone(),
        }
    }
}

/// Batch settings are absent unless a batch size is given
fn expand_batch(block: &str, batch: &BatchConfig) -> Result<Option<BatchSettings>, TriggerError> {
    let Some(size) = batch.size.as_deref() else {
        return Ok(None);
    };
    let size = parse_int(&format!("{}.batch_size", block), size)?;
    let cutoff = batch
        .cutoff
        .as_deref()
        .ok_or_else(|| TriggerError::MissingConditional {
            field: format!("{}.batch_cutoff", block),
            when: format!("{}.batch_size", block),
        })?;
    let cutoff = parse_seconds(&format!("{}.batch_cutoff", block), cutoff)?;

    Ok(Some(BatchSettings {
        size,
        cutoff: Some(cutoff),
    }))
}

/// Map level names to wire levels. Unknown names are skipped.
fn expand_levels(names: &BTreeSet<String>) -> Vec<LogLevel> {
    let mut levels = BTreeSet::new();
    for name in names {
        match level_from_name(&name.to_lowercase()) {
            Some(level) => {
                levels.insert(level);
            }
            None => warn!("Ignoring unknown logging level '{}'", name),
        }
    }
    levels.into_iter().collect()
}

pub(super) fn level_from_name(name: &str) -> Option<LogLevel> {
    match name {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        "fatal" => Some(LogLevel::Fatal),
        _ => None,
    }
}

fn parse_int(field: &str, text: &str) -> Result<i64, TriggerError> {
    text.parse()
        .map_err(|e: std::num::ParseIntError| TriggerError::InvalidNumber {
            field: field.to_string(),
            value: text.to_string(),
            reason: e.to_string(),
        })
}

fn parse_seconds(field: &str, text: &str) -> Result<Duration, TriggerError> {
    text.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| TriggerError::InvalidNumber {
            field: field.to_string(),
            value: text.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::tests::{base_attrs, block_value, timer_attrs};
    use ycloud_core::resource::Value;

    fn config_with(block: &str, fields: &[(&str, Value)]) -> TriggerConfig {
        let mut attrs = base_attrs();
        attrs.insert(block.to_string(), block_value(fields));
        TriggerConfig::from_attributes(&attrs).unwrap()
    }

    #[test]
    fn timer_without_retry_invokes_once() {
        let config = TriggerConfig::from_attributes(&timer_attrs()).unwrap();
        let Rule::Timer(timer) = expand_rule(&config).unwrap() else {
            panic!("expected timer rule");
        };
        assert_eq!(timer.cron_expression, "* * * * *");
        assert_eq!(
            timer.invoke_function,
            Some(InvokeFunctionOnce {
                function_id: "fn-1".to_string(),
                ..Default::default()
            })
        );
        assert!(timer.invoke_function_with_retry.is_none());
    }

    #[test]
    fn timer_with_retry_or_dlq_invokes_with_retry() {
        let mut with_retry = timer_attrs();
        with_retry.insert(
            "function".to_string(),
            block_value(&[
                ("id", Value::from("fn-1")),
                ("retry_attempts", Value::from("3")),
                ("retry_interval", Value::from("20")),
            ]),
        );
        let config = TriggerConfig::from_attributes(&with_retry).unwrap();
        let Rule::Timer(timer) = expand_rule(&config).unwrap() else {
            panic!("expected timer rule");
        };
        assert!(timer.invoke_function.is_none());
        let invoke = timer.invoke_function_with_retry.unwrap();
        assert_eq!(
            invoke.retry_settings,
            Some(RetrySettings {
                retry_attempts: 3,
                interval: Some(Duration::from_secs(20)),
            })
        );

        let mut with_dlq = timer_attrs();
        with_dlq.insert(
            "dlq".to_string(),
            block_value(&[
                ("queue_id", Value::from("dlq-1")),
                ("service_account_id", Value::from("sa-1")),
            ]),
        );
        let config = TriggerConfig::from_attributes(&with_dlq).unwrap();
        let Rule::Timer(timer) = expand_rule(&config).unwrap() else {
            panic!("expected timer rule");
        };
        let invoke = timer.invoke_function_with_retry.unwrap();
        assert!(invoke.retry_settings.is_none());
        assert_eq!(invoke.dead_letter_queue.unwrap().queue_id, "dlq-1");
    }

    #[test]
    fn message_queue_cutoff_without_size_has_no_batch() {
        let config = config_with(
            "message_queue",
            &[
                ("queue_id", Value::from("q1")),
                ("service_account_id", Value::from("sa1")),
                ("batch_cutoff", Value::from("10")),
            ],
        );
        let Rule::MessageQueue(mq) = expand_rule(&config).unwrap() else {
            panic!("expected message queue rule");
        };
        assert!(mq.batch_settings.is_none());
        assert!(mq.invoke_function.is_some());
    }

    #[test]
    fn batch_size_requires_cutoff() {
        let config = config_with(
            "log_group",
            &[
                ("log_group_ids", Value::string_set(["lg-1"])),
                ("batch_size", Value::from("10")),
            ],
        );
        assert_eq!(
            expand_rule(&config).unwrap_err(),
            TriggerError::MissingConditional {
                field: "log_group.batch_cutoff".to_string(),
                when: "log_group.batch_size".to_string(),
            }
        );
    }

    #[test]
    fn unparsable_numbers_name_the_field() {
        let config = config_with(
            "message_queue",
            &[
                ("queue_id", Value::from("q1")),
                ("service_account_id", Value::from("sa1")),
                ("batch_size", Value::from("ten")),
                ("batch_cutoff", Value::from("10")),
            ],
        );
        let err = expand_rule(&config).unwrap_err();
        assert!(matches!(
            err,
            TriggerError::InvalidNumber { ref field, .. } if field == "message_queue.batch_size"
        ));
        assert!(err.to_string().contains("message_queue.batch_size"));

        let mut attrs = timer_attrs();
        attrs.insert(
            "function".to_string(),
            block_value(&[
                ("id", Value::from("fn-1")),
                ("retry_attempts", Value::from("3x")),
            ]),
        );
        let config = TriggerConfig::from_attributes(&attrs).unwrap();
        assert!(matches!(
            expand_rule(&config),
            Err(TriggerError::InvalidNumber { ref field, .. }) if field == "function.retry_attempts"
        ));
    }

    #[test]
    fn padded_numbers_are_rejected() {
        let config = config_with(
            "message_queue",
            &[
                ("queue_id", Value::from("q1")),
                ("service_account_id", Value::from("sa1")),
                ("batch_size", Value::from("10")),
                ("batch_cutoff", Value::from(" 10")),
            ],
        );
        assert!(matches!(
            expand_rule(&config),
            Err(TriggerError::InvalidNumber { ref field, .. }) if field == "message_queue.batch_cutoff"
        ));

        let schema = crate::schemas::function_trigger::function_trigger_schema();
        let mut attrs = base_attrs();
        attrs.insert(
            "message_queue".to_string(),
            block_value(&[
                ("queue_id", Value::from("q1")),
                ("service_account_id", Value::from("sa1")),
                ("batch_size", Value::from("10")),
                ("batch_cutoff", Value::from(" 10")),
            ]),
        );
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("batch_cutoff")));
    }

    #[test]
    fn unknown_levels_are_dropped() {
        let config = config_with(
            "logging",
            &[
                ("group_id", Value::from("lg-1")),
                ("levels", Value::string_set(["debug", "bogus"])),
            ],
        );
        let Rule::Logging(logging) = expand_rule(&config).unwrap() else {
            panic!("expected logging rule");
        };
        assert_eq!(logging.levels, vec![LogLevel::Debug]);
    }

    #[test]
    fn level_names_are_case_insensitive() {
        let config = config_with(
            "logging",
            &[
                ("group_id", Value::from("lg-1")),
                ("levels", Value::string_set(["WARN", "warn", "Error"])),
            ],
        );
        let Rule::Logging(logging) = expand_rule(&config).unwrap() else {
            panic!("expected logging rule");
        };
        assert_eq!(logging.levels, vec![LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn object_storage_events_follow_flags() {
        let config = config_with(
            "object_storage",
            &[
                ("bucket_id", Value::from("bucket")),
                ("delete", Value::Bool(true)),
                ("create", Value::Bool(true)),
                ("update", Value::Bool(false)),
            ],
        );
        let Rule::ObjectStorage(storage) = expand_rule(&config).unwrap() else {
            panic!("expected object storage rule");
        };
        assert_eq!(
            storage.event_type,
            vec![
                ObjectStorageEventType::CreateObject,
                ObjectStorageEventType::DeleteObject
            ]
        );

        let config = config_with("object_storage", &[("bucket_id", Value::from("bucket"))]);
        let Rule::ObjectStorage(storage) = expand_rule(&config).unwrap() else {
            panic!("expected object storage rule");
        };
        assert!(storage.event_type.is_empty());
    }

    #[test]
    fn create_request_carries_metadata() {
        let mut attrs = timer_attrs();
        attrs.insert("description".to_string(), Value::from("every minute"));
        let config = TriggerConfig::from_attributes(&attrs).unwrap();
        let req = expand_create_request(&config, "b1g").unwrap();
        assert_eq!(req.folder_id, "b1g");
        assert_eq!(req.name, "t1");
        assert_eq!(req.description, "every minute");
        assert!(matches!(req.rule, Rule::Timer(_)));
    }
}
