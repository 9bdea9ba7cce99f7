//! # Cirrus Validate
//!
//! Declarative schema validation for cirrus functions.
//!
//! A [`Schema`] describes required fields, per-field primitive types and
//! named formats. It compiles into a reusable [`CompiledSchema`] whose
//! [`check`](CompiledSchema::check) collects every violation in one pass.
//! [`validate`] turns a failed check into an `INVALID_INPUT`
//! [`ApiError`](cirrus_core::ApiError) the error translator renders as a 400.
//!
//! ## Example
//!
//! ```
//! use cirrus_validate::{validate, FieldType, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .property_with_format("name", FieldType::String, "nonEmptyOrBlank")
//!     .property("age", FieldType::Number)
//!     .required("name")
//!     .build();
//!
//! assert!(validate(&schema, &json!({"name": "Ada", "age": 30})).is_ok());
//!
//! let err = validate(&schema, &json!({"age": 30})).unwrap_err();
//! assert!(err.message().contains("'name'"));
//! ```

#![doc(html_root_url = "https://docs.rs/cirrus-validate/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod checker;
mod error;
mod format;
mod schema;
mod validator;

pub use checker::{CompiledSchema, ValidationResult, Violation, ViolationKind};
pub use error::SchemaError;
pub use format::{FormatPredicate, FormatRegistry};
pub use schema::{FieldType, PropertySchema, Schema, SchemaBuilder};
pub use validator::{compile, global, validate, Validator};
