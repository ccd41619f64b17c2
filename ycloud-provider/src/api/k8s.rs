//! Managed Kubernetes node group messages (`yandex.cloud.k8s.v1`)

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire::{self, wire_enum};

wire_enum! {
    pub enum NodeGroupStatus {
        Unspecified = "STATUS_UNSPECIFIED",
        Provisioning = "PROVISIONING",
        Running = "RUNNING",
        Reconciling = "RECONCILING",
        Stopping = "STOPPING",
        Stopped = "STOPPED",
        Deleting = "DELETING",
        Starting = "STARTING",
    }
}

wire_enum! {
    pub enum DayOfWeek {
        Unspecified = "DAY_OF_WEEK_UNSPECIFIED",
        Monday = "MONDAY",
        Tuesday = "TUESDAY",
        Wednesday = "WEDNESDAY",
        Thursday = "THURSDAY",
        Friday = "FRIDAY",
        Saturday = "SATURDAY",
        Sunday = "SUNDAY",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroup {
    pub id: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub status: NodeGroupStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_template: Option<NodeTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_policy: Option<ScalePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_policy: Option<AllocationPolicy>,
    #[serde(default)]
    pub instance_group_id: String,
    #[serde(default)]
    pub node_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_info: Option<VersionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_policy: Option<MaintenancePolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    #[serde(default)]
    pub platform_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_spec: Option<ResourcesSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_disk_spec: Option<DiskSpec>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4_address_spec: Option<NodeAddressSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_policy: Option<SchedulingPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesSpec {
    /// Bytes
    #[serde(default, with = "wire::int64")]
    pub memory: i64,
    #[serde(default, with = "wire::int64")]
    pub cores: i64,
    #[serde(default, with = "wire::int64")]
    pub core_fraction: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    #[serde(default)]
    pub disk_type_id: String,
    /// Bytes
    #[serde(default, with = "wire::int64")]
    pub disk_size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAddressSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_to_one_nat_spec: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingPolicy {
    #[serde(default)]
    pub preemptible: bool,
}

/// Either `fixed_scale` or `auto_scale` is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_scale: Option<FixedScale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scale: Option<AutoScale>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedScale {
    #[serde(default, with = "wire::int64")]
    pub size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScale {
    #[serde(default, with = "wire::int64")]
    pub min_size: i64,
    #[serde(default, with = "wire::int64")]
    pub max_size: i64,
    #[serde(default, with = "wire::int64")]
    pub initial_size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPolicy {
    #[serde(default)]
    pub locations: Vec<NodeGroupLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroupLocation {
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default)]
    pub current_version: String,
    #[serde(default)]
    pub new_revision_available: bool,
    #[serde(default)]
    pub new_revision_summary: String,
    #[serde(default)]
    pub version_deprecated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePolicy {
    #[serde(default)]
    pub auto_upgrade: bool,
    #[serde(default)]
    pub auto_repair: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window: Option<MaintenanceWindow>,
}

/// One of `anytime`, `daily_maintenance_window`, `weekly_maintenance_window`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anytime: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_maintenance_window: Option<DailyMaintenanceWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_maintenance_window: Option<WeeklyMaintenanceWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMaintenanceWindow {
    #[serde(default)]
    pub start_time: TimeOfDay,
    #[serde(default, with = "wire::duration", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMaintenanceWindow {
    #[serde(default)]
    pub days_of_week: Vec<DaysOfWeekMaintenanceWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaysOfWeekMaintenanceWindow {
    #[serde(default)]
    pub days: Vec<DayOfWeek>,
    #[serde(default)]
    pub start_time: TimeOfDay,
    #[serde(default, with = "wire::duration", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

/// `google.type.TimeOfDay`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDay {
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
    #[serde(default)]
    pub nanos: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNodeGroupsResponse {
    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}
