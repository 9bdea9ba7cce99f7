//! # Cirrus Telemetry
//!
//! Logging setup for cirrus functions.
//!
//! Every invocation runs inside an `invocation` span carrying the
//! invocation id and function name. Log lines written through the request's
//! [`Logger`](cirrus_core::Logger) and the framework's own `tracing` events
//! end up in the same subscriber, installed once per process by
//! [`init_logging`].
//!
//! ```rust,ignore
//! use cirrus_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! ```

#![doc(html_root_url = "https://docs.rs/cirrus-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, invocation_span, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
