//! # Cirrus
//!
//! **Middleware pipeline for serverless HTTP functions**
//!
//! Cirrus wraps a plain async handler in a fixed, hardened pipeline:
//!
//! - **CORS** headers on every response, success or failure, and automatic
//!   preflight answers
//! - **Body parsing** of JSON and form bodies before the handler runs
//! - **Schema validation** with structured `INVALID_INPUT` errors listing
//!   every violation
//! - **Error translation** of anything the handler returns, or panics with,
//!   into a uniform `{"error": {"kind", "message"}}` response
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cirrus::prelude::*;
//! use serde_json::{json, Value};
//!
//! fn token<'a>(
//!     req: &'a mut RequestContext,
//!     res: &'a mut ResponseContext,
//! ) -> BoxFuture<'a, anyhow::Result<()>> {
//!     Box::pin(async move {
//!         let schema = Schema::builder()
//!             .property_with_format("name", FieldType::String, "nonEmptyOrBlank")
//!             .property("age", FieldType::Number)
//!             .required("name")
//!             .build();
//!         let body = req.json().cloned().unwrap_or(Value::Null);
//!         validate(&schema, &body)?;
//!
//!         res.set_header("Authorization", "token")?;
//!         res.send(&json!({"data": "token generated"}))?;
//!         Ok(())
//!     })
//! }
//!
//! let entrypoint = Function::from_handler(token, Metadata::default()).entrypoint();
//! let response = entrypoint(request, InvocationContext::new("token")).await?;
//! ```
//!
//! ## Architecture
//!
//! The stage order is fixed and cannot be changed per function:
//!
//! ```text
//! Request → CORS → BodyParse → Handler → Response
//!             │        │          │
//!             └────────┴──────────┴──→ ErrorTranslator → Response
//! ```

#![doc(html_root_url = "https://docs.rs/cirrus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod function;
mod invocation;

pub use function::{Entrypoint, Function, FunctionError, PlatformRequest, PlatformResponse};
pub use invocation::InvocationContext;

// Re-export the member crates
pub use cirrus_config as config;
pub use cirrus_core as core;
pub use cirrus_middleware as middleware;
pub use cirrus_telemetry as telemetry;
pub use cirrus_validate as validation;

pub use cirrus_core::{ApiError, ErrorKind};
pub use cirrus_middleware::{handler_fn, BoxFuture, Handler, Metadata};
pub use cirrus_validate::{compile, validate, Schema};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use cirrus::prelude::*;
///
/// let err = ApiError::invalid_input("data must have required property 'name'");
/// assert_eq!(err.kind(), &ErrorKind::InvalidInput);
/// ```
pub mod prelude {
    pub use crate::{
        Entrypoint, Function, FunctionError, InvocationContext, PlatformRequest, PlatformResponse,
    };

    pub use cirrus_core::{
        ApiError, ApiResult, Body, ErrorKind, Failure, InvocationId, Logger, RequestContext,
        ResponseContext,
    };

    pub use cirrus_middleware::{handler_fn, BoxFuture, Handler, Metadata};

    pub use cirrus_validate::{
        compile, validate, CompiledSchema, FieldType, FormatRegistry, Schema, ValidationResult,
        Validator,
    };

    pub use cirrus_config::{ConfigLoader, FunctionConfig};
    pub use cirrus_telemetry::{init_logging, LogConfig};
}
