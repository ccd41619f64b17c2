//! Resource type definitions for the Yandex provider

use ycloud_core::provider::{ResourceKind, ResourceType};
use ycloud_core::schema::ResourceSchema;

use crate::schemas::{function_trigger, kubernetes_node_group};

pub const FUNCTION_TRIGGER: &str = "function_trigger";
pub const KUBERNETES_NODE_GROUP: &str = "kubernetes_node_group";

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $kind:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn kind(&self) -> ResourceKind {
                $kind
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(
    FunctionTriggerType,
    FUNCTION_TRIGGER,
    ResourceKind::Managed,
    function_trigger::function_trigger_schema
);
define_resource_type!(
    KubernetesNodeGroupType,
    KUBERNETES_NODE_GROUP,
    ResourceKind::DataSource,
    kubernetes_node_group::kubernetes_node_group_schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(FunctionTriggerType), Box::new(KubernetesNodeGroupType)]
}

/// Look up a resource type by name
pub fn resource_type(name: &str) -> Option<Box<dyn ResourceType>> {
    resource_types().into_iter().find(|t| t.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_match_type_names() {
        for t in resource_types() {
            assert_eq!(t.schema().resource_type, t.name());
        }
    }

    #[test]
    fn node_group_is_a_data_source() {
        assert_eq!(
            resource_type(KUBERNETES_NODE_GROUP).map(|t| t.kind()),
            Some(ResourceKind::DataSource)
        );
        assert_eq!(
            resource_type(FUNCTION_TRIGGER).map(|t| t.kind()),
            Some(ResourceKind::Managed)
        );
        assert!(resource_type("vpc").is_none());
    }
}
