//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type,
//! enabling validation before any API call is made.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Floating point number (integers are accepted too)
    Float,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Set (list without duplicates, order is irrelevant)
    Set(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Block(Box<BlockSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, .. }, v) => {
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Set(inner), Value::List(items)) => {
                let mut seen = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                    if seen.contains(&item) {
                        return Err(TypeError::DuplicateSetItem { index: i });
                    }
                    seen.push(item);
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(block), Value::Map(map)) => block.validate_first(map),

            (AttributeType::Block(block), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let result = match item {
                        Value::Map(map) => block.validate_first(map),
                        other => Err(TypeError::TypeMismatch {
                            expected: "Block".to_string(),
                            got: other.type_name(),
                        }),
                    };
                    result.map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' conflicts with '{other}'")]
    Conflict { name: String, other: String },

    #[error("Attribute '{name}' must have at least {min} item(s), got {got}")]
    TooFewItems { name: String, min: usize, got: usize },

    #[error("Attribute '{name}' must have at most {max} item(s), got {got}")]
    TooManyItems { name: String, max: usize, got: usize },

    #[error("Duplicate set item at index {index}")]
    DuplicateSetItem { index: usize },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Filled in by the cloud when not configured
    pub computed: bool,
    /// Changing this attribute requires replacing the object
    pub force_new: bool,
    /// Attributes that must not be set together with this one
    pub conflicts_with: Vec<String>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            conflicts_with: Vec::new(),
            min_items: None,
            max_items: None,
            description: None,
        }
    }

    /// A nested block that may appear at most once
    pub fn block(name: impl Into<String>, block: BlockSchema) -> Self {
        Self::new(name, AttributeType::Block(Box::new(block))).with_max_items(1)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn conflicts_with<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts_with = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    fn check_item_count(&self, value: &Value) -> Option<TypeError> {
        let got = match value {
            Value::List(items) => items.len(),
            Value::Map(_) if matches!(self.attr_type, AttributeType::Block(_)) => 1,
            _ => return None,
        };
        if let Some(min) = self.min_items
            && got < min
        {
            return Some(TypeError::TooFewItems {
                name: self.name.clone(),
                min,
                got,
            });
        }
        if let Some(max) = self.max_items
            && got > max
        {
            return Some(TypeError::TooManyItems {
                name: self.name.clone(),
                max,
                got,
            });
        }
        None
    }
}

/// Attributes of a nested block
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: HashMap<String, AttributeSchema>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    fn validate_first(&self, attributes: &HashMap<String, Value>) -> Result<(), TypeError> {
        match validate_attributes(&self.attributes, attributes).into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let errors = validate_attributes(&self.attributes, attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_force_new(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.force_new)
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.computed)
    }

    /// Names of the given attributes whose change requires replacement
    pub fn force_new_attributes<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .filter(|n| self.is_force_new(n))
            .map(String::as_str)
            .collect()
    }
}

fn is_present(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

fn validate_attributes(
    schemas: &HashMap<String, AttributeSchema>,
    attributes: &HashMap<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    // Check required attributes (sorted for stable messages)
    let mut names: Vec<&String> = schemas.keys().collect();
    names.sort();
    for name in names {
        let schema = &schemas[name];
        if schema.required && !is_present(attributes.get(name)) {
            errors.push(TypeError::MissingRequired { name: name.clone() });
        }
    }

    let mut reported: HashSet<(String, String)> = HashSet::new();
    let present: BTreeSet<&String> = attributes
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, _)| k)
        .collect();

    for name in &present {
        let Some(schema) = schemas.get(*name) else {
            // Unknown attributes are allowed (for flexibility)
            continue;
        };
        let value = &attributes[*name];

        if let Err(e) = schema.attr_type.validate(value) {
            errors.push(TypeError::AttributeError {
                name: (*name).clone(),
                inner: Box::new(e),
            });
        }
        if let Some(e) = schema.check_item_count(value) {
            errors.push(e);
        }

        for other in &schema.conflicts_with {
            if present.contains(&other) {
                let pair = if *name < other {
                    ((*name).clone(), other.clone())
                } else {
                    (other.clone(), (*name).clone())
                };
                if reported.insert(pair.clone()) {
                    errors.push(TypeError::Conflict {
                        name: pair.0,
                        other: pair.1,
                    });
                }
            }
        }
    }

    errors
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Integer carried as decimal text (e.g., "10")
    pub fn decimal_int() -> AttributeType {
        AttributeType::Custom {
            name: "DecimalInt".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    s.parse::<i64>()
                        .map(|_| ())
                        .map_err(|_| format!("'{}' is not a decimal integer", s))
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Number of seconds carried as decimal text (e.g., "30")
    pub fn decimal_seconds() -> AttributeType {
        AttributeType::Custom {
            name: "DecimalSeconds".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    s.parse::<u64>()
                        .map(|_| ())
                        .map_err(|_| format!("'{}' is not a non-negative number of seconds", s))
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Set of strings
    pub fn string_set() -> AttributeType {
        AttributeType::Set(Box::new(AttributeType::String))
    }

    /// String to string map (labels, metadata)
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_float_accepts_int() {
        let t = AttributeType::Float;
        assert!(t.validate(&Value::Float(1.5)).is_ok());
        assert!(t.validate(&Value::Int(2)).is_ok());
        assert!(t.validate(&Value::Bool(true)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["a".to_string(), "b".to_string()]);
        assert!(t.validate(&Value::String("a".to_string())).is_ok());
        assert!(t.validate(&Value::String("c".to_string())).is_err());
    }

    #[test]
    fn validate_decimal_text() {
        let t = types::decimal_int();
        assert!(t.validate(&Value::from("10")).is_ok());
        assert!(t.validate(&Value::from("-3")).is_ok());
        assert!(t.validate(&Value::from("ten")).is_err());

        let t = types::decimal_seconds();
        assert!(t.validate(&Value::from("30")).is_ok());
        assert!(t.validate(&Value::from("-30")).is_err());
    }

    #[test]
    fn set_rejects_duplicates() {
        let t = types::string_set();
        assert!(
            t.validate(&Value::List(vec![Value::from("a"), Value::from("b")]))
                .is_ok()
        );
        assert!(matches!(
            t.validate(&Value::List(vec![Value::from("a"), Value::from("a")])),
            Err(TypeError::DuplicateSetItem { index: 1 })
        ));
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::decimal_int()))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("count".to_string(), Value::from("5"));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("trigger")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let attrs = HashMap::new();
        let result = schema.validate(&attrs);
        assert!(result.is_err());

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from(""));
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn nested_block_is_validated() {
        let schema = ResourceSchema::new("trigger").attribute(AttributeSchema::block(
            "function",
            BlockSchema::new()
                .attribute(AttributeSchema::new("id", AttributeType::String).required())
                .attribute(AttributeSchema::new("retry_attempts", types::decimal_int())),
        ));

        let mut function = HashMap::new();
        function.insert("retry_attempts".to_string(), Value::from("x"));
        let mut attrs = HashMap::new();
        attrs.insert("function".to_string(), Value::Map(function.clone()));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("function"));

        function.insert("id".to_string(), Value::from("fn-1"));
        function.insert("retry_attempts".to_string(), Value::from("3"));
        attrs.insert("function".to_string(), Value::List(vec![Value::Map(function)]));
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn block_max_items() {
        let schema = ResourceSchema::new("trigger").attribute(AttributeSchema::block(
            "timer",
            BlockSchema::new().attribute(AttributeSchema::new("cron_expression", AttributeType::String)),
        ));

        let block = Value::Map(HashMap::from([(
            "cron_expression".to_string(),
            Value::from("* * * * *"),
        )]));
        let mut attrs = HashMap::new();
        attrs.insert("timer".to_string(), Value::List(vec![block.clone(), block]));

        let errors = schema.validate(&attrs).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::TooManyItems { max: 1, got: 2, .. }))
        );
    }

    #[test]
    fn conflicting_attributes_reported_once() {
        let schema = ResourceSchema::new("trigger")
            .attribute(AttributeSchema::new("a", AttributeType::String).conflicts_with(["b"]))
            .attribute(AttributeSchema::new("b", AttributeType::String).conflicts_with(["a"]));

        let mut attrs = HashMap::new();
        attrs.insert("a".to_string(), Value::from("1"));
        attrs.insert("b".to_string(), Value::from("2"));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Attribute 'a' conflicts with 'b'");

        // Empty values do not count as set
        attrs.insert("b".to_string(), Value::from(""));
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn force_new_lookup() {
        let schema = ResourceSchema::new("trigger")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(AttributeSchema::new("timer", AttributeType::String).force_new());

        let changed = vec!["name".to_string(), "timer".to_string()];
        assert_eq!(schema.force_new_attributes(&changed), vec!["timer"]);
    }
}
