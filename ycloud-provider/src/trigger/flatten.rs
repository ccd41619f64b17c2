//! Wire trigger -> trigger configuration

use std::collections::BTreeSet;
use std::time::Duration;

use log::warn;

use super::{BatchConfig, DlqConfig, FunctionConfig, RuleConfig, TriggerConfig, TriggerError};
use crate::api::triggers::{
    BatchSettings, InvokeFunctionOnce, InvokeFunctionWithRetry, LogLevel, ObjectStorageEventType,
    Rule, Trigger,
};
use crate::utils::format_timestamp;

/// Project a trigger read from the API onto its configuration
pub fn flatten_trigger(trigger: &Trigger) -> Result<TriggerConfig, TriggerError> {
    let rule = trigger
        .rule
        .as_ref()
        .ok_or_else(|| TriggerError::MissingRule(trigger.id.clone()))?;

    let mut function = FunctionConfig::default();
    let mut dlq = None;

    let rule = match rule {
        Rule::IotMessage(iot) => {
            (function, dlq) = flatten_with_retry(iot.invoke_function.as_ref());
            RuleConfig::Iot {
                registry_id: iot.registry_id.clone(),
                device_id: non_empty(&iot.device_id),
                topic: non_empty(&iot.mqtt_topic),
            }
        }

        Rule::MessageQueue(mq) => {
            if let Some(invoke) = &mq.invoke_function {
                function = flatten_once(invoke);
            }
            RuleConfig::MessageQueue {
                queue_id: mq.queue_id.clone(),
                service_account_id: mq.service_account_id.clone(),
                batch: flatten_batch(mq.batch_settings.as_ref()),
                visibility_timeout: mq.visibility_timeout.map(seconds_text),
            }
        }

        Rule::ObjectStorage(storage) => {
            (function, dlq) = flatten_with_retry(storage.invoke_function.as_ref());
            let mut create = false;
            let mut update = false;
            let mut delete = false;
            for event in &storage.event_type {
                match event {
                    ObjectStorageEventType::CreateObject => create = true,
                    ObjectStorageEventType::UpdateObject => update = true,
                    ObjectStorageEventType::DeleteObject => delete = true,
                    ObjectStorageEventType::Unspecified => {}
                }
            }
            RuleConfig::ObjectStorage {
                bucket_id: storage.bucket_id.clone(),
                prefix: non_empty(&storage.prefix),
                suffix: non_empty(&storage.suffix),
                create,
                update,
                delete,
            }
        }

        Rule::Timer(timer) => {
            if timer.invoke_function_with_retry.is_some() {
                (function, dlq) = flatten_with_retry(timer.invoke_function_with_retry.as_ref());
            } else if let Some(invoke) = &timer.invoke_function {
                function = flatten_once(invoke);
            }
            RuleConfig::Timer {
                cron_expression: timer.cron_expression.clone(),
            }
        }

        Rule::CloudLogs(logs) => {
            (function, dlq) = flatten_with_retry(logs.invoke_function.as_ref());
            RuleConfig::LogGroup {
                log_group_ids: logs.log_group_id.iter().cloned().collect(),
                batch: flatten_batch(logs.batch_settings.as_ref()),
            }
        }

        Rule::Logging(logging) => {
            (function, dlq) = flatten_with_retry(logging.invoke_function.as_ref());
            RuleConfig::Logging {
                group_id: logging.log_group_id.clone(),
                resource_ids: logging.resource_id.iter().cloned().collect(),
                resource_types: logging.resource_type.iter().cloned().collect(),
                levels: flatten_levels(&logging.levels),
                batch: flatten_batch(logging.batch_settings.as_ref()),
            }
        }
    };

    Ok(TriggerConfig {
        name: trigger.name.clone(),
        description: trigger.description.clone(),
        folder_id: non_empty(&trigger.folder_id),
        labels: trigger.labels.clone(),
        function,
        dlq,
        rule,
        created_at: trigger.created_at.as_ref().map(format_timestamp),
    })
}

fn flatten_once(invoke: &InvokeFunctionOnce) -> FunctionConfig {
    FunctionConfig {
        id: invoke.function_id.clone(),
        tag: non_empty(&invoke.function_tag),
        service_account_id: non_empty(&invoke.service_account_id),
        retry_attempts: None,
        retry_interval: None,
    }
}

fn flatten_with_retry(
    invoke: Option<&InvokeFunctionWithRetry>,
) -> (FunctionConfig, Option<DlqConfig>) {
    let Some(invoke) = invoke else {
        return (FunctionConfig::default(), None);
    };

    let mut function = FunctionConfig {
        id: invoke.function_id.clone(),
        tag: non_empty(&invoke.function_tag),
        service_account_id: non_empty(&invoke.service_account_id),
        retry_attempts: None,
        retry_interval: None,
    };
    if let Some(retry) = &invoke.retry_settings {
        // Zero attempts with an interval means only the interval was configured
        if retry.retry_attempts != 0 || retry.interval.is_none() {
            function.retry_attempts = Some(retry.retry_attempts.to_string());
        }
        function.retry_interval = retry.interval.map(seconds_text);
    }

    let dlq = invoke.dead_letter_queue.as_ref().map(|q| DlqConfig {
        queue_id: q.queue_id.clone(),
        service_account_id: q.service_account_id.clone(),
    });

    (function, dlq)
}

fn flatten_batch(batch: Option<&BatchSettings>) -> BatchConfig {
    match batch {
        Some(b) => BatchConfig {
            size: Some(b.size.to_string()),
            cutoff: b.cutoff.map(seconds_text),
        },
        None => BatchConfig::default(),
    }
}

/// Wire levels to lowercase names. Levels without a name are skipped.
fn flatten_levels(levels: &[LogLevel]) -> BTreeSet<String> {
    levels
        .iter()
        .filter_map(|level| {
            let name = level_name(*level);
            if name.is_none() {
                warn!("Skipping unknown logging level {}", level.as_str());
            }
            name.map(String::from)
        })
        .collect()
}

fn level_name(level: LogLevel) -> Option<&'static str> {
    match level {
        LogLevel::Trace => Some("trace"),
        LogLevel::Debug => Some("debug"),
        LogLevel::Info => Some("info"),
        LogLevel::Warn => Some("warn"),
        LogLevel::Error => Some("error"),
        LogLevel::Fatal => Some("fatal"),
        LogLevel::Unspecified => None,
    }
}

fn seconds_text(d: Duration) -> String {
    d.as_secs().to_string()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
