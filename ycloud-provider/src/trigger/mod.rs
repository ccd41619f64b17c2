//! Function trigger configuration
//!
//! `TriggerConfig` is the typed form of the `function_trigger` attribute tree.
//! The six mutually exclusive event-source blocks collapse into a single
//! `RuleConfig` value, so the "exactly one" check happens only here, at the
//! attribute-tree boundary.
//!
//! - `expand` - `TriggerConfig` -> wire request
//! - `flatten` - wire `Trigger` -> `TriggerConfig`

pub mod expand;
pub mod flatten;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::warn;
use ycloud_core::provider::{ErrorKind, ProviderError};
use ycloud_core::resource::Value;

pub use expand::{expand_create_request, expand_rule};
pub use flatten::flatten_trigger;

/// Event-source blocks, in the order they are reported
pub const RULE_BLOCKS: [&str; 6] = [
    "iot",
    "message_queue",
    "object_storage",
    "timer",
    "log_group",
    "logging",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("must have exactly one of iot, message_queue, object_storage, timer, log_group, logging (found {})", found_label(.0))]
    RuleCount(Vec<String>),

    #[error("{0} is required")]
    MissingField(String),

    #[error("{field} is required when {when} is set")]
    MissingConditional { field: String, when: String },

    #[error("cannot parse {field} '{value}': {reason}")]
    InvalidNumber {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{field} must be {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("trigger {0} has no rule")]
    MissingRule(String),
}

impl From<TriggerError> for ProviderError {
    fn from(e: TriggerError) -> Self {
        // A trigger read back without a rule is a cloud-side problem
        let kind = match e {
            TriggerError::MissingRule(_) => ErrorKind::Api,
            _ => ErrorKind::Validation,
        };
        ProviderError::new(e.to_string()).with_kind(kind).with_cause(e)
    }
}

fn found_label(found: &[String]) -> String {
    if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionConfig {
    pub id: String,
    pub tag: Option<String>,
    pub service_account_id: Option<String>,
    /// Decimal text
    pub retry_attempts: Option<String>,
    /// Seconds, decimal text
    pub retry_interval: Option<String>,
}

impl FunctionConfig {
    pub fn has_retry(&self) -> bool {
        self.retry_attempts.is_some() || self.retry_interval.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DlqConfig {
    pub queue_id: String,
    pub service_account_id: String,
}

/// Batch size and cutoff (seconds) as decimal text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchConfig {
    pub size: Option<String>,
    pub cutoff: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleConfig {
    Iot {
        registry_id: String,
        device_id: Option<String>,
        topic: Option<String>,
    },
    MessageQueue {
        queue_id: String,
        service_account_id: String,
        batch: BatchConfig,
        visibility_timeout: Option<String>,
    },
    ObjectStorage {
        bucket_id: String,
        prefix: Option<String>,
        suffix: Option<String>,
        create: bool,
        update: bool,
        delete: bool,
    },
    Timer {
        cron_expression: String,
    },
    LogGroup {
        log_group_ids: BTreeSet<String>,
        batch: BatchConfig,
    },
    Logging {
        group_id: String,
        resource_ids: BTreeSet<String>,
        resource_types: BTreeSet<String>,
        levels: BTreeSet<String>,
        batch: BatchConfig,
    },
}

impl RuleConfig {
    /// Name of the attribute block holding this rule
    pub fn block_name(&self) -> &'static str {
        match self {
            RuleConfig::Iot { .. } => "iot",
            RuleConfig::MessageQueue { .. } => "message_queue",
            RuleConfig::ObjectStorage { .. } => "object_storage",
            RuleConfig::Timer { .. } => "timer",
            RuleConfig::LogGroup { .. } => "log_group",
            RuleConfig::Logging { .. } => "logging",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub name: String,
    pub description: String,
    pub folder_id: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub function: FunctionConfig,
    pub dlq: Option<DlqConfig>,
    pub rule: RuleConfig,
    /// RFC 3339, set by the cloud
    pub created_at: Option<String>,
}

type Attrs = HashMap<String, Value>;

impl TriggerConfig {
    /// Read a trigger from its attribute tree
    pub fn from_attributes(attrs: &Attrs) -> Result<Self, TriggerError> {
        let populated = RULE_BLOCKS
            .iter()
            .filter(|name| attrs.get(**name).is_some_and(|v| !v.is_empty()))
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        if populated.len() != 1 {
            return Err(TriggerError::RuleCount(populated));
        }
        let block_name = populated[0].as_str();
        let rule = read_rule(block_name, block(attrs, block_name)?.unwrap_or(&HashMap::new()))?;

        let function = match block(attrs, "function")? {
            Some(f) => FunctionConfig {
                id: required_string(f, "function", "id")?,
                tag: optional_string(f, "function", "tag")?,
                service_account_id: optional_string(f, "function", "service_account_id")?,
                retry_attempts: optional_string(f, "function", "retry_attempts")?,
                retry_interval: optional_string(f, "function", "retry_interval")?,
            },
            None => return Err(TriggerError::MissingField("function".to_string())),
        };

        let dlq = match block(attrs, "dlq")? {
            Some(d) => Some(DlqConfig {
                queue_id: required_string(d, "dlq", "queue_id")?,
                service_account_id: required_string(d, "dlq", "service_account_id")?,
            }),
            None => None,
        };

        let config = Self {
            name: string_field(attrs, "", "name")?
                .ok_or_else(|| TriggerError::MissingField("name".to_string()))?,
            description: string_field(attrs, "", "description")?.unwrap_or_default(),
            folder_id: string_field(attrs, "", "folder_id")?,
            labels: string_map(attrs, "labels")?,
            function,
            dlq,
            rule,
            created_at: string_field(attrs, "", "created_at")?,
        };
        Ok(config.normalized())
    }

    /// Drop settings the API does not keep, so the configuration equals the
    /// trigger read back after creating it
    fn normalized(mut self) -> Self {
        let function = &mut self.function;
        if function.retry_interval.is_some()
            && function
                .retry_attempts
                .as_deref()
                .is_some_and(|v| v.parse::<i64>().ok() == Some(0))
        {
            function.retry_attempts = None;
        }

        // A cutoff without a size produces no batch settings
        if let RuleConfig::MessageQueue { batch, .. }
        | RuleConfig::LogGroup { batch, .. }
        | RuleConfig::Logging { batch, .. } = &mut self.rule
            && batch.size.is_none()
        {
            batch.cutoff = None;
        }

        if let RuleConfig::Logging { levels, .. } = &mut self.rule {
            *levels = known_levels(levels);
        }
        self
    }

    /// Write the trigger back as an attribute tree
    ///
    /// Unset values are omitted and nested blocks are written as maps, so the
    /// result compares equal to a configuration holding the same settings.
    pub fn to_attributes(&self) -> Attrs {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from(self.name.as_str()));
        put(&mut attrs, "description", Some(&self.description));
        put(&mut attrs, "folder_id", self.folder_id.as_ref());
        put(&mut attrs, "created_at", self.created_at.as_ref());
        if !self.labels.is_empty() {
            let labels = self
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            attrs.insert("labels".to_string(), Value::Map(labels));
        }

        let mut function = HashMap::new();
        put(&mut function, "id", Some(&self.function.id));
        put(&mut function, "tag", self.function.tag.as_ref());
        put(
            &mut function,
            "service_account_id",
            self.function.service_account_id.as_ref(),
        );
        put(&mut function, "retry_attempts", self.function.retry_attempts.as_ref());
        put(&mut function, "retry_interval", self.function.retry_interval.as_ref());
        attrs.insert("function".to_string(), Value::Map(function));

        if let Some(dlq) = &self.dlq {
            let mut block = HashMap::new();
            put(&mut block, "queue_id", Some(&dlq.queue_id));
            put(&mut block, "service_account_id", Some(&dlq.service_account_id));
            attrs.insert("dlq".to_string(), Value::Map(block));
        }

        attrs.insert(
            self.rule.block_name().to_string(),
            Value::Map(write_rule(&self.rule)),
        );
        attrs
    }
}

fn read_rule(name: &str, b: &Attrs) -> Result<RuleConfig, TriggerError> {
    let rule = match name {
        "iot" => RuleConfig::Iot {
            registry_id: required_string(b, name, "registry_id")?,
            device_id: optional_string(b, name, "device_id")?,
            topic: optional_string(b, name, "topic")?,
        },
        "message_queue" => RuleConfig::MessageQueue {
            queue_id: required_string(b, name, "queue_id")?,
            service_account_id: required_string(b, name, "service_account_id")?,
            batch: read_batch(b, name)?,
            visibility_timeout: optional_string(b, name, "visibility_timeout")?,
        },
        "object_storage" => RuleConfig::ObjectStorage {
            bucket_id: required_string(b, name, "bucket_id")?,
            prefix: optional_string(b, name, "prefix")?,
            suffix: optional_string(b, name, "suffix")?,
            create: bool_field(b, name, "create")?,
            update: bool_field(b, name, "update")?,
            delete: bool_field(b, name, "delete")?,
        },
        "timer" => RuleConfig::Timer {
            cron_expression: required_string(b, name, "cron_expression")?,
        },
        "log_group" => {
            let log_group_ids = string_set(b, name, "log_group_ids")?;
            if log_group_ids.is_empty() {
                return Err(TriggerError::MissingField(format!("{}.log_group_ids", name)));
            }
            RuleConfig::LogGroup {
                log_group_ids,
                batch: read_batch(b, name)?,
            }
        }
        _ => RuleConfig::Logging {
            group_id: required_string(b, name, "group_id")?,
            resource_ids: string_set(b, name, "resource_ids")?,
            resource_types: string_set(b, name, "resource_types")?,
            levels: string_set(b, name, "levels")?,
            batch: read_batch(b, name)?,
        },
    };
    Ok(rule)
}

/// Lowercase level names; unknown names are skipped
fn known_levels(names: &BTreeSet<String>) -> BTreeSet<String> {
    names
        .iter()
        .filter_map(|name| {
            let lower = name.to_lowercase();
            if expand::level_from_name(&lower).is_some() {
                Some(lower)
            } else {
                warn!("Ignoring unknown logging level '{}'", name);
                None
            }
        })
        .collect()
}

fn read_batch(b: &Attrs, block: &str) -> Result<BatchConfig, TriggerError> {
    Ok(BatchConfig {
        size: optional_string(b, block, "batch_size")?,
        cutoff: optional_string(b, block, "batch_cutoff")?,
    })
}

fn write_rule(rule: &RuleConfig) -> Attrs {
    let mut b = HashMap::new();
    match rule {
        RuleConfig::Iot {
            registry_id,
            device_id,
            topic,
        } => {
            put(&mut b, "registry_id", Some(registry_id));
            put(&mut b, "device_id", device_id.as_ref());
            put(&mut b, "topic", topic.as_ref());
        }
        RuleConfig::MessageQueue {
            queue_id,
            service_account_id,
            batch,
            visibility_timeout,
        } => {
            put(&mut b, "queue_id", Some(queue_id));
            put(&mut b, "service_account_id", Some(service_account_id));
            put(&mut b, "visibility_timeout", visibility_timeout.as_ref());
            write_batch(&mut b, batch);
        }
        RuleConfig::ObjectStorage {
            bucket_id,
            prefix,
            suffix,
            create,
            update,
            delete,
        } => {
            put(&mut b, "bucket_id", Some(bucket_id));
            put(&mut b, "prefix", prefix.as_ref());
            put(&mut b, "suffix", suffix.as_ref());
            for (key, enabled) in [("create", create), ("update", update), ("delete", delete)] {
                if *enabled {
                    b.insert(key.to_string(), Value::Bool(true));
                }
            }
        }
        RuleConfig::Timer { cron_expression } => {
            put(&mut b, "cron_expression", Some(cron_expression));
        }
        RuleConfig::LogGroup {
            log_group_ids,
            batch,
        } => {
            put_set(&mut b, "log_group_ids", log_group_ids);
            write_batch(&mut b, batch);
        }
        RuleConfig::Logging {
            group_id,
            resource_ids,
            resource_types,
            levels,
            batch,
        } => {
            put(&mut b, "group_id", Some(group_id));
            put_set(&mut b, "resource_ids", resource_ids);
            put_set(&mut b, "resource_types", resource_types);
            put_set(&mut b, "levels", levels);
            write_batch(&mut b, batch);
        }
    }
    b
}

fn write_batch(b: &mut Attrs, batch: &BatchConfig) {
    put(b, "batch_size", batch.size.as_ref());
    put(b, "batch_cutoff", batch.cutoff.as_ref());
}

fn put(attrs: &mut Attrs, key: &str, value: Option<&String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        attrs.insert(key.to_string(), Value::from(v.as_str()));
    }
}

fn put_set(attrs: &mut Attrs, key: &str, items: &BTreeSet<String>) {
    if !items.is_empty() {
        attrs.insert(key.to_string(), Value::string_set(items.iter().cloned()));
    }
}

fn path(block: &str, field: &str) -> String {
    if block.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", block, field)
    }
}

fn block<'a>(attrs: &'a Attrs, name: &str) -> Result<Option<&'a Attrs>, TriggerError> {
    match attrs.get(name) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => v.as_block().map(Some).ok_or_else(|| TriggerError::TypeMismatch {
            field: name.to_string(),
            expected: "a single block",
        }),
    }
}

/// String attribute; empty text counts as unset
fn string_field(attrs: &Attrs, block: &str, field: &str) -> Result<Option<String>, TriggerError> {
    match attrs.get(field) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        // Numbers are accepted where decimal text is expected
        Some(Value::Int(i)) => Ok(Some(i.to_string())),
        Some(_) => Err(TriggerError::TypeMismatch {
            field: path(block, field),
            expected: "a string",
        }),
    }
}

fn optional_string(b: &Attrs, block: &str, field: &str) -> Result<Option<String>, TriggerError> {
    string_field(b, block, field)
}

fn required_string(b: &Attrs, block: &str, field: &str) -> Result<String, TriggerError> {
    string_field(b, block, field)?.ok_or_else(|| TriggerError::MissingField(path(block, field)))
}

fn bool_field(b: &Attrs, block: &str, field: &str) -> Result<bool, TriggerError> {
    match b.get(field) {
        None => Ok(false),
        Some(Value::Bool(v)) => Ok(*v),
        Some(_) => Err(TriggerError::TypeMismatch {
            field: path(block, field),
            expected: "a boolean",
        }),
    }
}

fn string_set(b: &Attrs, block: &str, field: &str) -> Result<BTreeSet<String>, TriggerError> {
    let Some(value) = b.get(field) else {
        return Ok(BTreeSet::new());
    };
    let mismatch = || TriggerError::TypeMismatch {
        field: path(block, field),
        expected: "a list of strings",
    };
    let items = value.as_list().ok_or_else(mismatch)?;
    items
        .iter()
        .map(|item| item.as_str().map(String::from).ok_or_else(mismatch))
        .collect()
}

fn string_map(attrs: &Attrs, field: &str) -> Result<BTreeMap<String, String>, TriggerError> {
    let Some(value) = attrs.get(field) else {
        return Ok(BTreeMap::new());
    };
    let mismatch = || TriggerError::TypeMismatch {
        field: field.to_string(),
        expected: "a map of strings",
    };
    let map = value.as_map().ok_or_else(mismatch)?;
    map.iter()
        .map(|(k, v)| {
            v.as_str()
                .map(|s| (k.clone(), s.to_string()))
                .ok_or_else(mismatch)
        })
        .collect()
}
