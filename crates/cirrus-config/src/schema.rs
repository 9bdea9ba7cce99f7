//! Configuration section types.
//!
//! Every section rejects unknown keys and fills missing keys from its
//! defaults, so a file only needs to name the values it changes.

use cirrus_telemetry::LogConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CORS header table.
///
/// # Example
///
/// ```
/// use cirrus_config::CorsConfig;
///
/// let cors = CorsConfig::default();
/// assert_eq!(cors.allow_origin, "*");
/// assert_eq!(cors.max_age_secs, Some(86400));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`.
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,

    /// Methods listed in `Access-Control-Allow-Methods`.
    #[serde(default = "default_allow_methods")]
    pub allow_methods: Vec<String>,

    /// Headers listed in `Access-Control-Allow-Headers`.
    #[serde(default = "default_allow_headers")]
    pub allow_headers: Vec<String>,

    /// Send `Access-Control-Allow-Credentials: true`.
    #[serde(default)]
    pub allow_credentials: bool,

    /// `Access-Control-Max-Age` in seconds. `None` omits the header.
    #[serde(default = "default_max_age")]
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

fn default_allow_origin() -> String {
    "*".to_string()
}

fn default_allow_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_allow_headers() -> Vec<String> {
    vec!["Content-Type".to_string(), "Authorization".to_string()]
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_age() -> Option<u64> {
    Some(86400)
}

/// Error translation policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorConfig {
    /// Send internal error messages to callers instead of the generic one.
    #[serde(default)]
    pub expose_internal_errors: bool,

    /// Message sent in place of a redacted internal error.
    #[serde(default = "default_internal_error_message")]
    pub internal_error_message: String,

    /// Status codes for application-defined error kinds, keyed by code.
    #[serde(default)]
    pub kinds: BTreeMap<String, u16>,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            expose_internal_errors: false,
            internal_error_message: default_internal_error_message(),
            kinds: BTreeMap::new(),
        }
    }
}

fn default_internal_error_message() -> String {
    "An internal error occurred".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

impl From<LogFormat> for cirrus_telemetry::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line.
    #[serde(default)]
    pub file_line_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the telemetry crate's settings.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format.into(),
            span_events: self.span_events,
            file_line_info: self.file_line_info,
            include_target: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
