//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive did not parse.
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed, or installation failed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}
