//! Differ - Compare desired state with current state
//!
//! Compares the "desired state" declared in a configuration file with the
//! "current state" fetched from the Provider, and decides whether the object
//! has to be created, updated in place, replaced, or left alone.

use std::collections::{BTreeSet, HashMap};

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists but an immutable attribute changed -> delete and create
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State) -> Diff {
    diff_with_schema(desired, current, None)
}

/// Compare desired state with current state, using the schema to skip
/// computed attributes the configuration leaves unset and to detect changes
/// that require replacement.
pub fn diff_with_schema(
    desired: &Resource,
    current: &State,
    schema: Option<&ResourceSchema>,
) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let replace = schema.is_some_and(|s| !s.force_new_attributes(&changed).is_empty());
    if replace {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
///
/// Empty values are treated as unset on both sides. The result is sorted.
pub fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let keys: BTreeSet<&String> = desired.keys().chain(current.keys()).collect();
    let mut changed = Vec::new();

    for key in keys {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        let want = desired.get(key).filter(|v| !v.is_empty());
        let have = current.get(key).filter(|v| !v.is_empty());

        match (want, have) {
            (None, None) => {}
            (Some(w), Some(h)) if w == h => {}
            // Computed attributes are filled in by the cloud when not configured
            (None, Some(_))
                if schema.is_some_and(|s| {
                    s.is_computed(key) || !s.attributes.contains_key(key.as_str())
                }) => {}
            _ => changed.push(key.clone()),
        }
    }

    changed
}
