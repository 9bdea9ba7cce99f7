//! Root configuration type.

use crate::{ConfigError, CorsConfig, ErrorConfig, LogFormat, LoggingConfig};
use http::header::HeaderValue;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

/// Complete configuration of one function.
///
/// # Example
///
/// ```
/// use cirrus_config::FunctionConfig;
///
/// let config = FunctionConfig::default();
/// assert!(!config.errors.expose_internal_errors);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct FunctionConfig {
    /// CORS header table.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Error translation policy.
    #[serde(default)]
    pub errors: ErrorConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FunctionConfig {
    /// Local development preset: pretty debug logs, internal errors exposed.
    #[must_use]
    pub fn development() -> Self {
        Self {
            cors: CorsConfig::default(),
            errors: ErrorConfig {
                expose_internal_errors: true,
                ..ErrorConfig::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                span_events: true,
                file_line_info: true,
                ..LoggingConfig::default()
            },
        }
    }

    /// Deployed preset: JSON info logs, internal errors redacted.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Checks values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cors.allow_origin.is_empty() {
            return Err(ConfigError::invalid_value(
                "cors.allow_origin",
                "must not be empty",
            ));
        }
        if HeaderValue::from_str(&self.cors.allow_origin).is_err() {
            return Err(ConfigError::invalid_value(
                "cors.allow_origin",
                format!("not a valid header value: {:?}", self.cors.allow_origin),
            ));
        }

        for method in &self.cors.allow_methods {
            if method.parse::<Method>().is_err() {
                return Err(ConfigError::invalid_value(
                    "cors.allow_methods",
                    format!("invalid method: {method:?}"),
                ));
            }
        }

        if HeaderValue::from_str(&self.cors.allow_headers.join(", ")).is_err() {
            return Err(ConfigError::invalid_value(
                "cors.allow_headers",
                "contains characters not allowed in a header value",
            ));
        }

        if self.errors.internal_error_message.is_empty() {
            return Err(ConfigError::invalid_value(
                "errors.internal_error_message",
                "must not be empty",
            ));
        }

        for (code, status) in &self.errors.kinds {
            if code.is_empty() {
                return Err(ConfigError::invalid_value(
                    "errors.kinds",
                    "kind codes must not be empty",
                ));
            }
            match StatusCode::from_u16(*status) {
                Ok(s) if s.is_client_error() || s.is_server_error() => {}
                _ => {
                    return Err(ConfigError::invalid_value(
                        format!("errors.kinds.{code}"),
                        format!("expected a 4xx or 5xx status, got {status}"),
                    ))
                }
            }
        }

        if self.logging.enabled {
            cirrus_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }
}
