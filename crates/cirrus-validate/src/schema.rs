//! Declarative schema types.
//!
//! A [`Schema`] lists the properties it checks and the fields that must be
//! present. It deserializes from the usual JSON shape:
//!
//! ```json
//! {
//!   "properties": {
//!     "name": { "type": "string", "format": "nonEmptyOrBlank" },
//!     "age":  { "type": "number" }
//!   },
//!   "required": ["name"]
//! }
//! ```
//!
//! Schemas compare and hash structurally, so two independently built copies
//! of the same shape share one compiled checker.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Primitive JSON type a property must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// JSON string.
    String,
    /// Any JSON number.
    Number,
    /// JSON number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// JSON object.
    Object,
    /// JSON array.
    Array,
}

impl FieldType {
    /// Returns the schema keyword for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Returns `true` if `value` has this type.
    ///
    /// Numeric-looking strings are not numbers.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks applied to one property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Expected JSON type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Named format predicate, applied to string values only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl PropertySchema {
    /// Creates a property of the given type with no format.
    #[must_use]
    pub const fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            format: None,
        }
    }

    /// Adds a named format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// A declarative description of the shape of validated data.
///
/// Properties not listed are ignored by the checker.
///
/// # Example
///
/// ```
/// use cirrus_validate::{FieldType, Schema};
///
/// let schema = Schema::builder()
///     .property_with_format("name", FieldType::String, "nonEmptyOrBlank")
///     .property("age", FieldType::Number)
///     .required("name")
///     .build();
///
/// assert_eq!(schema.required(), ["name"]);
/// assert_eq!(schema.properties().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    required: Vec<String>,
}

impl Schema {
    /// Creates a schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parses a schema from its JSON form.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        Self::deserialize(value).map_err(SchemaError::Malformed)
    }

    /// Returns the described properties, ordered by name.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, PropertySchema> {
        &self.properties
    }

    /// Returns the required field names in declared order.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Describes a property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.schema
            .properties
            .insert(name.into(), PropertySchema::new(field_type));
        self
    }

    /// Describes a property with a named format.
    #[must_use]
    pub fn property_with_format(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        format: impl Into<String>,
    ) -> Self {
        self.schema.properties.insert(
            name.into(),
            PropertySchema::new(field_type).with_format(format),
        );
        self
    }

    /// Marks a field as required. Duplicates are ignored.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.schema.required.contains(&name) {
            self.schema.required.push(name);
        }
        self
    }

    /// Builds the schema.
    #[must_use]
    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_matching() {
        assert!(FieldType::String.matches(&json!("x")));
        assert!(!FieldType::String.matches(&json!(1)));
        assert!(FieldType::Number.matches(&json!(30)));
        assert!(FieldType::Number.matches(&json!(1.5)));
        assert!(!FieldType::Number.matches(&json!("30")));
        assert!(FieldType::Integer.matches(&json!(30)));
        assert!(FieldType::Integer.matches(&json!(30.0)));
        assert!(!FieldType::Integer.matches(&json!(30.5)));
        assert!(FieldType::Boolean.matches(&json!(false)));
        assert!(FieldType::Object.matches(&json!({})));
        assert!(FieldType::Array.matches(&json!([])));
        assert!(!FieldType::Object.matches(&Value::Null));
    }

    #[test]
    fn test_schema_from_json() {
        let schema = Schema::from_json(&json!({
            "properties": {
                "name": {"type": "string", "format": "nonEmptyOrBlank"},
                "age": {"type": "number"}
            },
            "required": ["name"]
        }))
        .unwrap();

        assert_eq!(schema.required(), ["name"]);
        assert_eq!(
            schema.properties()["name"].format.as_deref(),
            Some("nonEmptyOrBlank")
        );
        assert_eq!(schema.properties()["age"].field_type, FieldType::Number);
    }

    #[test]
    fn test_schema_from_json_rejects_unknown_type() {
        let err = Schema::from_json(&json!({
            "properties": {"name": {"type": "text"}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));
    }

    #[test]
    fn test_builder_and_json_are_structurally_equal() {
        let built = Schema::builder()
            .property("age", FieldType::Number)
            .required("age")
            .required("age")
            .build();
        let parsed = Schema::from_json(&json!({
            "properties": {"age": {"type": "number"}},
            "required": ["age"]
        }))
        .unwrap();
        assert_eq!(built, parsed);
    }
}
