//! Compiled schema checkers.
//!
//! Compiling resolves every format name against a [`FormatRegistry`] once, so
//! checking is a pure walk over the data with no lookups that can fail.

use crate::error::SchemaError;
use crate::format::{FormatPredicate, FormatRegistry};
use crate::schema::{FieldType, Schema};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// What a [`Violation`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    /// A required field is absent.
    Required,
    /// A present field has the wrong JSON type.
    Type,
    /// A string field fails its named format.
    Format,
}

/// One field-level problem found by a checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The field the violation is about.
    pub field: String,
    /// Violation category.
    pub kind: ViolationKind,
    /// Human-readable description, e.g. `data/age must be number`.
    pub message: String,
}

/// Result of checking data against a compiled schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub valid: bool,
    /// Every violation found, in check order.
    pub errors: Vec<Violation>,
}

impl ValidationResult {
    /// Creates a passing result.
    #[must_use]
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Creates a result from collected violations.
    #[must_use]
    pub fn from_violations(errors: Vec<Violation>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Returns `true` if any violation was found.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Joins every violation message with `", "`.
    #[must_use]
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct CompiledProperty {
    name: String,
    field_type: FieldType,
    format: Option<(String, FormatPredicate)>,
}

/// A schema with its formats resolved, ready to check data.
///
/// # Example
///
/// ```
/// use cirrus_validate::{CompiledSchema, FieldType, FormatRegistry, Schema};
/// use serde_json::json;
///
/// let schema = Schema::builder()
///     .property("age", FieldType::Number)
///     .required("name")
///     .build();
/// let checker = CompiledSchema::compile(&schema, &FormatRegistry::default()).unwrap();
///
/// let result = checker.check(&json!({"age": "30"}));
/// assert!(!result.valid);
/// assert_eq!(
///     result.message(),
///     "data must have required property 'name', data/age must be number"
/// );
/// ```
pub struct CompiledSchema {
    required: Vec<String>,
    properties: Vec<CompiledProperty>,
}

impl CompiledSchema {
    /// Resolves the schema's formats against `formats`.
    pub fn compile(schema: &Schema, formats: &FormatRegistry) -> Result<Self, SchemaError> {
        let properties = schema
            .properties()
            .iter()
            .map(|(name, property)| {
                let format = match &property.format {
                    None => None,
                    Some(format) => {
                        let predicate =
                            formats
                                .get(format)
                                .ok_or_else(|| SchemaError::UnknownFormat {
                                    property: name.clone(),
                                    format: format.clone(),
                                })?;
                        Some((format.clone(), predicate.clone()))
                    }
                };
                Ok(CompiledProperty {
                    name: name.clone(),
                    field_type: property.field_type,
                    format,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(Self {
            required: schema.required().to_vec(),
            properties,
        })
    }

    /// Checks `data`, collecting every violation.
    ///
    /// Required fields are reported first in declared order, then property
    /// checks in property-name order. Data that is not an object has no
    /// fields, so only the required checks can fail.
    #[must_use]
    pub fn check(&self, data: &Value) -> ValidationResult {
        let object = data.as_object();
        let mut errors = Vec::new();

        for field in &self.required {
            if !object.is_some_and(|o| o.contains_key(field)) {
                errors.push(Violation {
                    field: field.clone(),
                    kind: ViolationKind::Required,
                    message: format!("data must have required property '{field}'"),
                });
            }
        }

        let Some(object) = object else {
            return ValidationResult::from_violations(errors);
        };

        for property in &self.properties {
            let Some(value) = object.get(&property.name) else {
                continue;
            };

            if !property.field_type.matches(value) {
                errors.push(Violation {
                    field: property.name.clone(),
                    kind: ViolationKind::Type,
                    message: format!("data/{} must be {}", property.name, property.field_type),
                });
                continue;
            }

            if let (Some((format, predicate)), Some(text)) = (&property.format, value.as_str()) {
                if !predicate(text) {
                    errors.push(Violation {
                        field: property.name.clone(),
                        kind: ViolationKind::Format,
                        message: format!("data/{} must match format \"{format}\"", property.name),
                    });
                }
            }
        }

        ValidationResult::from_violations(errors)
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("required", &self.required)
            .field(
                "properties",
                &self.properties.iter().map(|p| &p.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
