//! Validator with a shared compiled-checker cache.
//!
//! Compiled checkers are cached by the structural value of their [`Schema`].
//! The cache is a [`DashMap`]; a schema compiles under its entry lock, so
//! concurrent first use from many invocations compiles it once and every
//! caller gets the same [`Arc<CompiledSchema>`].

use crate::checker::{CompiledSchema, ValidationResult};
use crate::error::SchemaError;
use crate::format::FormatRegistry;
use crate::schema::Schema;
use cirrus_core::ApiError;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Compiles schemas against a format registry and caches the result.
///
/// # Example
///
/// ```
/// use cirrus_validate::{FieldType, Schema, Validator};
/// use serde_json::json;
///
/// let validator = Validator::new();
/// let schema = Schema::builder().property("age", FieldType::Number).required("age").build();
///
/// assert!(validator.validate(&schema, &json!({"age": 30})).is_ok());
///
/// let err = validator.validate(&schema, &json!({})).unwrap_err();
/// assert_eq!(err.message(), "data must have required property 'age'");
/// ```
#[derive(Debug)]
pub struct Validator {
    formats: FormatRegistry,
    cache: DashMap<Schema, Arc<CompiledSchema>>,
}

impl Validator {
    /// Creates a validator with the built-in formats.
    #[must_use]
    pub fn new() -> Self {
        Self::with_formats(FormatRegistry::default())
    }

    /// Creates a validator with a custom format registry.
    #[must_use]
    pub fn with_formats(formats: FormatRegistry) -> Self {
        Self {
            formats,
            cache: DashMap::new(),
        }
    }

    /// Returns the format registry used for compilation.
    #[must_use]
    pub const fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Returns a compiled checker, compiling it on first use.
    pub fn compile(&self, schema: &Schema) -> Result<Arc<CompiledSchema>, SchemaError> {
        if let Some(hit) = self.cache.get(schema) {
            return Ok(Arc::clone(hit.value()));
        }

        let entry = self
            .cache
            .entry(schema.clone())
            .or_try_insert_with(|| {
                tracing::debug!(
                    properties = schema.properties().len(),
                    required = schema.required().len(),
                    "compiling schema"
                );
                CompiledSchema::compile(schema, &self.formats).map(Arc::new)
            })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Checks `data` and returns every violation.
    pub fn check(&self, schema: &Schema, data: &Value) -> Result<ValidationResult, SchemaError> {
        Ok(self.compile(schema)?.check(data))
    }

    /// Validates `data`, failing with an `INVALID_INPUT` error that lists
    /// every violation.
    ///
    /// A schema that does not compile is reported as an `INTERNAL_ERROR`.
    pub fn validate(&self, schema: &Schema, data: &Value) -> Result<(), ApiError> {
        let checker = self.compile(schema).map_err(|err| {
            tracing::error!(error = %err, "schema failed to compile");
            ApiError::internal(format!("schema compilation failed: {err}"))
        })?;

        let result = checker.check(data);
        if result.valid {
            Ok(())
        } else {
            Err(ApiError::invalid_input(result.message()))
        }
    }

    /// Returns the number of cached checkers.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the process-wide validator with the built-in formats.
pub fn global() -> &'static Validator {
    static GLOBAL: OnceLock<Validator> = OnceLock::new();
    GLOBAL.get_or_init(Validator::new)
}

/// Compiles `schema` with the process-wide validator.
pub fn compile(schema: &Schema) -> Result<Arc<CompiledSchema>, SchemaError> {
    global().compile(schema)
}

/// Validates `data` with the process-wide validator.
///
/// # Example
///
/// ```
/// use cirrus_core::ErrorKind;
/// use cirrus_validate::{validate, FieldType, Schema};
/// use serde_json::json;
///
/// let schema = Schema::builder()
///     .property_with_format("name", FieldType::String, "nonEmptyOrBlank")
///     .required("name")
///     .build();
///
/// let err = validate(&schema, &json!({"name": "  "})).unwrap_err();
/// assert_eq!(err.kind(), &ErrorKind::InvalidInput);
/// ```
pub fn validate(schema: &Schema, data: &Value) -> Result<(), ApiError> {
    global().validate(schema, data)
}
