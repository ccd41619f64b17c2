//! Kubernetes node group data source
//!
//! Looks a node group up by id or by name and copies it into a flat
//! attribute tree. Sizes are converted from bytes to GiB; nothing else is
//! derived.

use std::collections::{BTreeMap, HashMap};

use ycloud_core::provider::ProviderError;
use ycloud_core::resource::Value;

use crate::api::k8s::{
    DayOfWeek, MaintenancePolicy, MaintenanceWindow, NodeGroup, NodeTemplate, ScalePolicy,
};
use crate::utils::{
    format_hms, format_time_of_day, format_timestamp, to_gigabytes, to_gigabytes_f64,
};

/// How the node group is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeGroupLookup {
    ById(String),
    ByName {
        name: String,
        folder_id: Option<String>,
    },
}

impl NodeGroupLookup {
    /// Exactly one of `node_group_id` and `name` must be set
    pub fn from_attributes(attrs: &HashMap<String, Value>) -> Result<Self, ProviderError> {
        let get = |key: &str| {
            attrs
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        match (get("node_group_id"), get("name")) {
            (Some(id), None) => Ok(NodeGroupLookup::ById(id)),
            (None, Some(name)) => Ok(NodeGroupLookup::ByName {
                name,
                folder_id: get("folder_id"),
            }),
            (None, None) => Err(ProviderError::validation(
                "one of node_group_id, name should be provided",
            )),
            (Some(_), Some(_)) => Err(ProviderError::validation(
                "only one of node_group_id, name can be provided",
            )),
        }
    }
}

/// Copy a node group into its attribute tree
pub fn flatten_node_group(ng: &NodeGroup) -> HashMap<String, Value> {
    let mut attrs = HashMap::new();
    let mut set = |key: &str, value: Value| {
        attrs.insert(key.to_string(), value);
    };

    set("node_group_id", Value::from(ng.id.as_str()));
    set("cluster_id", Value::from(ng.cluster_id.as_str()));
    set("name", Value::from(ng.name.as_str()));
    set("description", Value::from(ng.description.as_str()));
    set("labels", string_map(&ng.labels));
    set("status", Value::from(ng.status.as_str().to_lowercase()));
    set("instance_group_id", Value::from(ng.instance_group_id.as_str()));
    if let Some(created_at) = &ng.created_at {
        set("created_at", Value::from(format_timestamp(created_at)));
    }
    if let Some(template) = &ng.node_template {
        set("instance_template", flatten_template(template));
    }
    if let Some(policy) = &ng.scale_policy {
        set("scale_policy", flatten_scale_policy(policy));
    }
    if let Some(policy) = &ng.allocation_policy {
        let locations = policy
            .locations
            .iter()
            .map(|l| {
                block([
                    ("zone", Value::from(l.zone_id.as_str())),
                    ("subnet_id", Value::from(l.subnet_id.as_str())),
                ])
            })
            .collect();
        set(
            "allocation_policy",
            block([("location", Value::List(locations))]),
        );
    }
    if let Some(info) = &ng.version_info {
        set(
            "version_info",
            block([
                ("current_version", Value::from(info.current_version.as_str())),
                ("new_revision_available", Value::Bool(info.new_revision_available)),
                (
                    "new_revision_summary",
                    Value::from(info.new_revision_summary.as_str()),
                ),
                ("version_deprecated", Value::Bool(info.version_deprecated)),
            ]),
        );
    }
    if let Some(policy) = &ng.maintenance_policy {
        set("maintenance_policy", flatten_maintenance_policy(policy));
    }

    attrs
}

fn flatten_template(t: &NodeTemplate) -> Value {
    let mut b = HashMap::new();
    b.insert("platform_id".to_string(), Value::from(t.platform_id.as_str()));
    b.insert(
        "nat".to_string(),
        Value::Bool(
            t.v4_address_spec
                .as_ref()
                .is_some_and(|spec| spec.one_to_one_nat_spec.is_some()),
        ),
    );
    b.insert("metadata".to_string(), string_map(&t.metadata));

    if let Some(r) = &t.resources_spec {
        b.insert(
            "resources".to_string(),
            block([
                ("memory", Value::Float(to_gigabytes_f64(r.memory))),
                ("cores", Value::Int(r.cores)),
                ("core_fraction", Value::Int(r.core_fraction)),
            ]),
        );
    }
    if let Some(disk) = &t.boot_disk_spec {
        b.insert(
            "boot_disk".to_string(),
            block([
                ("size", Value::Int(to_gigabytes(disk.disk_size))),
                ("type", Value::from(disk.disk_type_id.as_str())),
            ]),
        );
    }
    if let Some(policy) = &t.scheduling_policy {
        b.insert(
            "scheduling_policy".to_string(),
            block([("preemptible", Value::Bool(policy.preemptible))]),
        );
    }

    Value::Map(b)
}

fn flatten_scale_policy(policy: &ScalePolicy) -> Value {
    let mut b = HashMap::new();
    if let Some(fixed) = &policy.fixed_scale {
        b.insert(
            "fixed_scale".to_string(),
            block([("size", Value::Int(fixed.size))]),
        );
    }
    if let Some(auto) = &policy.auto_scale {
        b.insert(
            "auto_scale".to_string(),
            block([
                ("min", Value::Int(auto.min_size)),
                ("max", Value::Int(auto.max_size)),
                ("initial", Value::Int(auto.initial_size)),
            ]),
        );
    }
    Value::Map(b)
}

fn flatten_maintenance_policy(policy: &MaintenancePolicy) -> Value {
    let mut b = HashMap::new();
    b.insert("auto_upgrade".to_string(), Value::Bool(policy.auto_upgrade));
    b.insert("auto_repair".to_string(), Value::Bool(policy.auto_repair));
    if let Some(window) = &policy.maintenance_window {
        let windows = flatten_maintenance_windows(window);
        if !windows.is_empty() {
            b.insert("maintenance_window".to_string(), Value::List(windows));
        }
    }
    Value::Map(b)
}

/// One entry per day for weekly windows, a single entry without a day for
/// daily windows, none for "anytime".
fn flatten_maintenance_windows(window: &MaintenanceWindow) -> Vec<Value> {
    let mut windows = Vec::new();

    if let Some(daily) = &window.daily_maintenance_window {
        windows.push(block([
            ("start_time", Value::from(format_time_of_day(&daily.start_time))),
            (
                "duration",
                Value::from(daily.duration.map(format_hms).unwrap_or_default()),
            ),
        ]));
    }

    if let Some(weekly) = &window.weekly_maintenance_window {
        for days in &weekly.days_of_week {
            let start_time = format_time_of_day(&days.start_time);
            let duration = days.duration.map(format_hms).unwrap_or_default();
            for day in &days.days {
                if *day == DayOfWeek::Unspecified {
                    continue;
                }
                windows.push(block([
                    ("day", Value::from(day.as_str().to_lowercase())),
                    ("start_time", Value::from(start_time.as_str())),
                    ("duration", Value::from(duration.as_str())),
                ]));
            }
        }
    }

    windows
}

fn block<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Map(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Map(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node_group() -> NodeGroup {
        serde_json::from_value(json!({
            "id": "cat0ng",
            "clusterId": "cls1",
            "createdAt": "2024-01-15T08:30:00Z",
            "name": "workers",
            "description": "general purpose",
            "labels": {"team": "core"},
            "status": "RUNNING",
            "nodeTemplate": {
                "platformId": "standard-v2",
                "resourcesSpec": {"memory": "6442450944", "cores": "2", "coreFraction": "50"},
                "bootDiskSpec": {"diskTypeId": "network-ssd", "diskSize": "68719476736"},
                "metadata": {"ssh-keys": "ubuntu:ssh-ed25519 AAAA"},
                "v4AddressSpec": {"oneToOneNatSpec": {"ipVersion": "IPV4"}},
                "schedulingPolicy": {"preemptible": true}
            },
            "scalePolicy": {"fixedScale": {"size": "3"}},
            "allocationPolicy": {"locations": [
                {"zoneId": "ru-central1-a", "subnetId": "e9b1"},
                {"zoneId": "ru-central1-b", "subnetId": "e2l2"}
            ]},
            "instanceGroupId": "cl1ig",
            "versionInfo": {
                "currentVersion": "1.27",
                "newRevisionAvailable": true,
                "newRevisionSummary": "patch",
                "versionDeprecated": false
            },
            "maintenancePolicy": {
                "autoUpgrade": true,
                "autoRepair": false,
                "maintenanceWindow": {
                    "weeklyMaintenanceWindow": {"daysOfWeek": [
                        {"days": ["MONDAY", "TUESDAY"], "startTime": {"hours": 23}, "duration": "10800s"}
                    ]}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn lookup_requires_exactly_one_key() {
        let mut attrs = HashMap::new();
        let err = NodeGroupLookup::from_attributes(&attrs).unwrap_err();
        assert_eq!(err.message, "one of node_group_id, name should be provided");

        attrs.insert("node_group_id".to_string(), Value::from("cat0ng"));
        assert_eq!(
            NodeGroupLookup::from_attributes(&attrs).unwrap(),
            NodeGroupLookup::ById("cat0ng".to_string())
        );

        attrs.insert("name".to_string(), Value::from("workers"));
        let err = NodeGroupLookup::from_attributes(&attrs).unwrap_err();
        assert_eq!(err.message, "only one of node_group_id, name can be provided");

        attrs.remove("node_group_id");
        attrs.insert("folder_id".to_string(), Value::from("b1g"));
        assert_eq!(
            NodeGroupLookup::from_attributes(&attrs).unwrap(),
            NodeGroupLookup::ByName {
                name: "workers".to_string(),
                folder_id: Some("b1g".to_string()),
            }
        );
    }

    #[test]
    fn flatten_top_level_fields() {
        let attrs = flatten_node_group(&node_group());
        assert_eq!(attrs["node_group_id"], Value::from("cat0ng"));
        assert_eq!(attrs["cluster_id"], Value::from("cls1"));
        assert_eq!(attrs["status"], Value::from("running"));
        assert_eq!(attrs["created_at"], Value::from("2024-01-15T08:30:00Z"));
        assert_eq!(attrs["instance_group_id"], Value::from("cl1ig"));
        assert_eq!(
            attrs["labels"].as_map().unwrap()["team"],
            Value::from("core")
        );
    }

    #[test]
    fn flatten_instance_template_units() {
        let attrs = flatten_node_group(&node_group());
        let template = attrs["instance_template"].as_block().unwrap();

        let resources = template["resources"].as_block().unwrap();
        assert_eq!(resources["memory"], Value::Float(6.0));
        assert_eq!(resources["cores"], Value::Int(2));
        assert_eq!(resources["core_fraction"], Value::Int(50));

        let disk = template["boot_disk"].as_block().unwrap();
        assert_eq!(disk["size"], Value::Int(64));
        assert_eq!(disk["type"], Value::from("network-ssd"));

        assert_eq!(template["nat"], Value::Bool(true));
        assert_eq!(template["platform_id"], Value::from("standard-v2"));
        assert_eq!(
            template["scheduling_policy"].as_block().unwrap()["preemptible"],
            Value::Bool(true)
        );
    }

    #[test]
    fn flatten_policies() {
        let attrs = flatten_node_group(&node_group());

        let scale = attrs["scale_policy"].as_block().unwrap();
        assert_eq!(
            scale["fixed_scale"].as_block().unwrap()["size"],
            Value::Int(3)
        );
        assert!(!scale.contains_key("auto_scale"));

        let locations = attrs["allocation_policy"].as_block().unwrap()["location"]
            .as_list()
            .unwrap()
            .to_vec();
        assert_eq!(locations.len(), 2);
        assert_eq!(
            locations[1].as_map().unwrap()["zone"],
            Value::from("ru-central1-b")
        );

        let version = attrs["version_info"].as_block().unwrap();
        assert_eq!(version["new_revision_available"], Value::Bool(true));
    }

    #[test]
    fn weekly_windows_expand_per_day() {
        let attrs = flatten_node_group(&node_group());
        let policy = attrs["maintenance_policy"].as_block().unwrap();
        assert_eq!(policy["auto_upgrade"], Value::Bool(true));
        assert_eq!(policy["auto_repair"], Value::Bool(false));

        let windows = policy["maintenance_window"].as_list().unwrap();
        assert_eq!(windows.len(), 2);
        let monday = windows[0].as_map().unwrap();
        assert_eq!(monday["day"], Value::from("monday"));
        assert_eq!(monday["start_time"], Value::from("23:00"));
        assert_eq!(monday["duration"], Value::from("3h"));
    }

    #[test]
    fn daily_and_anytime_windows() {
        let mut ng = node_group();
        ng.maintenance_policy = serde_json::from_value(json!({
            "maintenanceWindow": {
                "dailyMaintenanceWindow": {"startTime": {"hours": 2, "minutes": 30}, "duration": "5400s"}
            }
        }))
        .unwrap();
        let attrs = flatten_node_group(&ng);
        let windows = attrs["maintenance_policy"].as_block().unwrap()["maintenance_window"]
            .as_list()
            .unwrap()
            .to_vec();
        assert_eq!(windows.len(), 1);
        let daily = windows[0].as_map().unwrap();
        assert!(!daily.contains_key("day"));
        assert_eq!(daily["start_time"], Value::from("02:30"));
        assert_eq!(daily["duration"], Value::from("1h30m"));

        ng.maintenance_policy = serde_json::from_value(json!({
            "autoRepair": true,
            "maintenanceWindow": {"anytime": {}}
        }))
        .unwrap();
        let attrs = flatten_node_group(&ng);
        let policy = attrs["maintenance_policy"].as_block().unwrap();
        assert!(!policy.contains_key("maintenance_window"));
        assert_eq!(policy["auto_repair"], Value::Bool(true));
    }

    #[test]
    fn missing_template_is_omitted() {
        let ng = NodeGroup {
            id: "cat0ng".to_string(),
            ..Default::default()
        };
        let attrs = flatten_node_group(&ng);
        assert!(!attrs.contains_key("instance_template"));
        assert_eq!(attrs["status"], Value::from("status_unspecified"));
    }
}
