//! Kubernetes node group data source schema
//!
//! Everything is computed; `node_group_id` or `name` selects the group.

use ycloud_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

fn computed(name: &str, attr_type: AttributeType) -> AttributeSchema {
    AttributeSchema::new(name, attr_type).computed()
}

fn computed_block(name: &str, block: BlockSchema) -> AttributeSchema {
    AttributeSchema::block(name, block).computed()
}

fn instance_template() -> BlockSchema {
    BlockSchema::new()
        .attribute(computed("platform_id", AttributeType::String))
        .attribute(computed("nat", AttributeType::Bool))
        .attribute(computed("metadata", types::string_map()))
        .attribute(computed_block(
            "resources",
            BlockSchema::new()
                .attribute(
                    computed("memory", AttributeType::Float).with_description("Memory in GiB"),
                )
                .attribute(computed("cores", AttributeType::Int))
                .attribute(computed("core_fraction", AttributeType::Int)),
        ))
        .attribute(computed_block(
            "boot_disk",
            BlockSchema::new()
                .attribute(computed("size", AttributeType::Int).with_description("Size in GiB"))
                .attribute(computed("type", AttributeType::String)),
        ))
        .attribute(computed_block(
            "scheduling_policy",
            BlockSchema::new().attribute(computed("preemptible", AttributeType::Bool)),
        ))
}

fn scale_policy() -> BlockSchema {
    BlockSchema::new()
        .attribute(computed_block(
            "fixed_scale",
            BlockSchema::new().attribute(computed("size", AttributeType::Int)),
        ))
        .attribute(computed_block(
            "auto_scale",
            BlockSchema::new()
                .attribute(computed("min", AttributeType::Int))
                .attribute(computed("max", AttributeType::Int))
                .attribute(computed("initial", AttributeType::Int)),
        ))
}

fn maintenance_window() -> BlockSchema {
    BlockSchema::new()
        .attribute(computed("day", AttributeType::String))
        .attribute(computed("start_time", AttributeType::String))
        .attribute(computed("duration", AttributeType::String))
}

pub fn kubernetes_node_group_schema() -> ResourceSchema {
    ResourceSchema::new("kubernetes_node_group")
        .with_description("A Managed Service for Kubernetes node group (read-only)")
        .attribute(
            computed("node_group_id", AttributeType::String)
                .conflicts_with(["name"])
                .with_description("Node group ID. One of node_group_id and name is required"),
        )
        .attribute(computed("name", AttributeType::String).conflicts_with(["node_group_id"]))
        .attribute(
            computed("folder_id", AttributeType::String)
                .with_description("Folder searched by name (provider folder if not set)"),
        )
        .attribute(computed("cluster_id", AttributeType::String))
        .attribute(computed("description", AttributeType::String))
        .attribute(computed("labels", types::string_map()))
        .attribute(computed("status", AttributeType::String))
        .attribute(computed("created_at", AttributeType::String))
        .attribute(computed("instance_group_id", AttributeType::String))
        .attribute(computed_block("instance_template", instance_template()))
        .attribute(computed_block("scale_policy", scale_policy()))
        .attribute(computed_block(
            "allocation_policy",
            BlockSchema::new().attribute(computed(
                "location",
                AttributeType::List(Box::new(AttributeType::Block(Box::new(
                    BlockSchema::new()
                        .attribute(computed("zone", AttributeType::String))
                        .attribute(computed("subnet_id", AttributeType::String)),
                )))),
            )),
        ))
        .attribute(computed_block(
            "version_info",
            BlockSchema::new()
                .attribute(computed("current_version", AttributeType::String))
                .attribute(computed("new_revision_available", AttributeType::Bool))
                .attribute(computed("new_revision_summary", AttributeType::String))
                .attribute(computed("version_deprecated", AttributeType::Bool)),
        ))
        .attribute(computed_block(
            "maintenance_policy",
            BlockSchema::new()
                .attribute(computed("auto_upgrade", AttributeType::Bool))
                .attribute(computed("auto_repair", AttributeType::Bool))
                .attribute(computed(
                    "maintenance_window",
                    AttributeType::Set(Box::new(AttributeType::Block(Box::new(
                        maintenance_window(),
                    )))),
                )),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::k8s::NodeGroup;
    use crate::node_group::flatten_node_group;
    use serde_json::json;
    use std::collections::HashMap;
    use ycloud_core::resource::Value;

    #[test]
    fn flattened_node_group_matches_schema() {
        let ng: NodeGroup = serde_json::from_value(json!({
            "id": "cat0ng",
            "clusterId": "cls1",
            "name": "workers",
            "status": "RUNNING",
            "nodeTemplate": {
                "platformId": "standard-v3",
                "resourcesSpec": {"memory": "2147483648", "cores": "2", "coreFraction": "20"},
                "bootDiskSpec": {"diskTypeId": "network-hdd", "diskSize": "34359738368"}
            },
            "scalePolicy": {"autoScale": {"minSize": "1", "maxSize": "4", "initialSize": "1"}},
            "allocationPolicy": {"locations": [{"zoneId": "ru-central1-a", "subnetId": "e9b"}]},
            "maintenancePolicy": {
                "autoUpgrade": true,
                "maintenanceWindow": {
                    "dailyMaintenanceWindow": {"startTime": {"hours": 3}, "duration": "3600s"}
                }
            }
        }))
        .unwrap();

        let schema = kubernetes_node_group_schema();
        assert!(schema.validate(&flatten_node_group(&ng)).is_ok());
    }

    #[test]
    fn lookup_keys_conflict() {
        let schema = kubernetes_node_group_schema();
        let attrs: HashMap<String, Value> = HashMap::from([
            ("node_group_id".to_string(), Value::from("cat0ng")),
            ("name".to_string(), Value::from("workers")),
        ]);
        assert!(schema.validate(&attrs).is_err());
        assert!(schema.is_computed("instance_template"));
    }
}
