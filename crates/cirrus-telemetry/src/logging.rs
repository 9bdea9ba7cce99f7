//! Structured logging for cirrus functions.
//!
//! Installs a global `tracing` subscriber: JSON lines for production hosts
//! that ingest structured logs, a pretty multi-line format for local
//! development.
//!
//! # Example
//!
//! ```rust,ignore
//! use cirrus_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(function = "token", "cold start");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use cirrus_core::InvocationId;
use tracing::Span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable, multi-line.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to install a subscriber at all.
    pub enabled: bool,

    /// `EnvFilter` directive, e.g. `info` or `cirrus=debug,warn`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to emit span open/close events.
    pub span_events: bool,

    /// Whether to include file and line.
    pub file_line_info: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Pretty debug output for local runs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON info output for deployed functions.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad `level` directive and
/// [`TelemetryError::LoggingInit`] if a global subscriber already exists.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses an `EnvFilter` directive.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Creates the span that wraps one invocation.
#[must_use]
pub fn invocation_span(invocation_id: InvocationId, function: &str) -> Span {
    tracing::info_span!(
        "invocation",
        invocation_id = %invocation_id,
        function = function,
        http.status_code = tracing::field::Empty,
    )
}

/// Field names declared on the [`invocation_span`], for use with
/// [`Span::record`].
pub mod fields {
    /// Invocation id field name.
    pub const INVOCATION_ID: &str = "invocation_id";

    /// Function name field name.
    pub const FUNCTION: &str = "function";

    /// HTTP status code field name, empty until the response is known.
    pub const HTTP_STATUS: &str = "http.status_code";
}

/// Logs an invocation completion event.
#[macro_export]
macro_rules! log_invocation_complete {
    ($invocation_id:expr, $status:expr, $duration_ms:expr) => {
        tracing::info!(
            invocation_id = %$invocation_id,
            http.status_code = $status,
            duration_ms = $duration_ms,
            "Invocation completed"
        );
    };
}
