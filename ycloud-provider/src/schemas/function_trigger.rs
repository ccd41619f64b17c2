//! Function trigger schema

use ycloud_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use crate::trigger::RULE_BLOCKS;

fn string(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
}

/// A rule block: at most one item, conflicting with every other rule block
fn rule_block(name: &str, block: BlockSchema) -> AttributeSchema {
    AttributeSchema::block(name, block)
        .force_new()
        .conflicts_with(RULE_BLOCKS.iter().copied().filter(|other| *other != name))
}

fn with_batch(block: BlockSchema) -> BlockSchema {
    block
        .attribute(
            AttributeSchema::new("batch_size", types::decimal_int())
                .with_description("Maximum number of messages delivered in one invocation"),
        )
        .attribute(
            AttributeSchema::new("batch_cutoff", types::decimal_seconds()).with_description(
                "Maximum wait in seconds before a partial batch is delivered. Required with batch_size",
            ),
        )
}

pub fn function_trigger_schema() -> ResourceSchema {
    ResourceSchema::new("function_trigger")
        .with_description("A Yandex Cloud Functions trigger")
        .attribute(string("name").required().with_description("Trigger name"))
        .attribute(string("description"))
        .attribute(
            string("folder_id")
                .computed()
                .force_new()
                .with_description("Folder to create the trigger in (provider folder if not set)"),
        )
        .attribute(AttributeSchema::new("labels", types::string_map()))
        .attribute(string("created_at").computed())
        .attribute(
            AttributeSchema::block(
                "function",
                BlockSchema::new()
                    .attribute(string("id").required())
                    .attribute(string("tag"))
                    .attribute(string("service_account_id"))
                    .attribute(AttributeSchema::new("retry_attempts", types::decimal_int()))
                    .attribute(AttributeSchema::new(
                        "retry_interval",
                        types::decimal_seconds(),
                    )),
            )
            .required()
            .force_new()
            .with_description("Function invoked by the trigger"),
        )
        .attribute(
            AttributeSchema::block(
                "dlq",
                BlockSchema::new()
                    .attribute(string("queue_id").required())
                    .attribute(string("service_account_id").required()),
            )
            .force_new()
            .with_description("Queue receiving events that exhausted their retries"),
        )
        .attribute(rule_block(
            "iot",
            BlockSchema::new()
                .attribute(string("registry_id").required())
                .attribute(string("device_id"))
                .attribute(string("topic")),
        ))
        .attribute(rule_block(
            "message_queue",
            with_batch(
                BlockSchema::new()
                    .attribute(string("queue_id").required())
                    .attribute(string("service_account_id").required())
                    .attribute(AttributeSchema::new(
                        "visibility_timeout",
                        types::decimal_seconds(),
                    )),
            ),
        ))
        .attribute(rule_block(
            "object_storage",
            BlockSchema::new()
                .attribute(string("bucket_id").required())
                .attribute(string("prefix"))
                .attribute(string("suffix"))
                .attribute(AttributeSchema::new("create", AttributeType::Bool))
                .attribute(AttributeSchema::new("update", AttributeType::Bool))
                .attribute(AttributeSchema::new("delete", AttributeType::Bool)),
        ))
        .attribute(rule_block(
            "timer",
            BlockSchema::new().attribute(
                string("cron_expression")
                    .required()
                    .with_description("Cron expression in the six-field Yandex format"),
            ),
        ))
        .attribute(rule_block(
            "log_group",
            with_batch(BlockSchema::new().attribute(
                AttributeSchema::new("log_group_ids", types::string_set())
                    .required()
                    .with_min_items(1),
            )),
        ))
        .attribute(rule_block(
            "logging",
            with_batch(
                BlockSchema::new()
                    .attribute(string("group_id").required())
                    .attribute(AttributeSchema::new("resource_ids", types::string_set()))
                    .attribute(AttributeSchema::new("resource_types", types::string_set()))
                    .attribute(
                        AttributeSchema::new("levels", types::string_set())
                            .with_description("Severities to deliver (e.g., \"error\", \"warn\")"),
                    ),
            ),
        ))
}
