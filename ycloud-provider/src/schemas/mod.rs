//! Yandex Cloud resource schema definitions

pub mod function_trigger;
pub mod kubernetes_node_group;

use ycloud_core::schema::ResourceSchema;

/// Returns all Yandex Cloud schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![
        function_trigger::function_trigger_schema(),
        kubernetes_node_group::kubernetes_node_group_schema(),
    ]
}
