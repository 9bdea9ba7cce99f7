//! # Cirrus Config
//!
//! Typed, layered configuration for a cirrus function: the CORS header
//! table, the error-translation policy and logging.
//!
//! Layers stack as defaults, then files, then `.env`, then environment
//! variables. Unknown keys are rejected.
//!
//! # Example
//!
//! ```no_run
//! use cirrus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), cirrus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_production()
//!     .with_file("function.toml")?
//!     .with_env_prefix("CIRRUS")
//!     .load()?;
//!
//! println!("allowed origin: {}", config.cors.allow_origin);
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [cors]
//! allow_origin = "https://app.example.com"
//! allow_methods = ["GET", "POST", "OPTIONS"]
//! allow_headers = ["Content-Type", "Authorization"]
//! allow_credentials = true
//! max_age_secs = 600
//!
//! [errors]
//! expose_internal_errors = false
//! internal_error_message = "An internal error occurred"
//!
//! [errors.kinds]
//! QUOTA_EXCEEDED = 429
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/cirrus-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::FunctionConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CorsConfig, ErrorConfig, LogFormat, LoggingConfig};
