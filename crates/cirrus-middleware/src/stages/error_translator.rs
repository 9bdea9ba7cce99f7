//! Error translation stage.
//!
//! The translator is the one place where failures become HTTP responses.
//! Validators, handlers and earlier stages only return failures; the chain
//! hands the first one to [`ErrorTranslator::write`], which sets the status,
//! writes the error body and logs the failure.
//!
//! # Pipeline Position
//!
//! ```text
//! Cors → BodyParse → Handler ─(failure)→ [ErrorTranslation] → Response
//! ```
//!
//! # Error Body Format
//!
//! ```json
//! {
//!   "error": {
//!     "kind": "INVALID_INPUT",
//!     "message": "data must have required property 'name'"
//!   }
//! }
//! ```
//!
//! # Status Resolution
//!
//! 1. The error's explicit status code, if any
//! 2. The built-in kind table (`INVALID_INPUT` is 400, and so on)
//! 3. A status registered for a custom kind with
//!    [`register_kind`](ErrorTranslator::register_kind)
//! 4. `500 Internal Server Error`
//!
//! Unclassified failures always map to 500.
//!
//! # Example
//!
//! ```
//! use cirrus_core::{ApiError, Failure};
//! use cirrus_middleware::stages::ErrorTranslator;
//! use http::StatusCode;
//!
//! let translator = ErrorTranslator::new()
//!     .register_kind("QUOTA_EXCEEDED", StatusCode::TOO_MANY_REQUESTS);
//!
//! let failure = Failure::from(ApiError::custom("QUOTA_EXCEEDED", "slow down"));
//! let translated = translator.translate(&failure);
//! assert_eq!(translated.status, StatusCode::TOO_MANY_REQUESTS);
//! assert_eq!(translated.envelope.error.kind, "QUOTA_EXCEEDED");
//! ```

use cirrus_core::{ErrorEnvelope, ErrorKind, Failure, RequestContext, ResponseContext};
use http::StatusCode;
use std::collections::HashMap;

/// Default message sent in place of internal error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Converts failures into uniform error responses.
#[derive(Debug, Clone)]
pub struct ErrorTranslator {
    /// Whether to expose internal error details (development mode).
    expose_internal_errors: bool,
    /// Message sent for redacted internal errors.
    internal_error_message: String,
    /// Status codes for application-defined kinds.
    kinds: HashMap<String, StatusCode>,
}

/// A failure rendered into status and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedError {
    /// HTTP status to send.
    pub status: StatusCode,
    /// Body to send.
    pub envelope: ErrorEnvelope,
    /// Whether the message was replaced by the generic internal message.
    pub redacted: bool,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorTranslator {
    /// Creates a translator that redacts internal errors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expose_internal_errors: false,
            internal_error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            kinds: HashMap::new(),
        }
    }

    /// Sets whether to expose internal error details.
    ///
    /// **Warning**: Only enable this in development environments.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Sets the message sent for redacted internal errors.
    #[must_use]
    pub fn internal_error_message(mut self, message: impl Into<String>) -> Self {
        self.internal_error_message = message.into();
        self
    }

    /// Maps an application-defined kind code to a status.
    #[must_use]
    pub fn register_kind(mut self, code: impl Into<String>, status: StatusCode) -> Self {
        self.kinds.insert(code.into(), status);
        self
    }

    /// Returns `true` if internal error details are sent to callers.
    #[must_use]
    pub const fn exposes_internal_errors(&self) -> bool {
        self.expose_internal_errors
    }

    /// Resolves the status for a failure.
    #[must_use]
    pub fn status_for(&self, failure: &Failure) -> StatusCode {
        let Some(err) = failure.as_api() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };

        err.explicit_status()
            .or_else(|| err.kind().default_status_code())
            .or_else(|| match err.kind() {
                ErrorKind::Custom(code) => self.kinds.get(code).copied(),
                _ => None,
            })
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Renders a failure without touching any context.
    #[must_use]
    pub fn translate(&self, failure: &Failure) -> TranslatedError {
        let status = self.status_for(failure);
        let kind = failure.kind();
        let redacted = failure.is_internal() && !self.expose_internal_errors;

        let message = if redacted {
            self.internal_error_message.clone()
        } else {
            match failure {
                Failure::Api(err) => err.message().to_string(),
                Failure::Unclassified(err) => format!("{err:#}"),
            }
        };

        TranslatedError {
            status,
            envelope: ErrorEnvelope::new(kind.as_str(), message),
            redacted,
        }
    }

    /// Logs the failure through the request's sink, rewinds the response to
    /// its sealed headers, then writes status and error body.
    ///
    /// Only headers sealed before the failure (the CORS table) survive;
    /// anything a later stage wrote is dropped.
    pub fn write(
        &self,
        failure: &Failure,
        req: &RequestContext,
        res: &mut ResponseContext,
    ) -> StatusCode {
        let translated = self.translate(failure);
        let status = translated.status;

        let line = format!("request failed with {status}: {failure}");
        if status.is_server_error() {
            req.logger().error(line);
        } else {
            req.logger().warn(line);
        }

        let ErrorEnvelope { error } = translated.envelope;
        res.reset_to_sealed()
            .status(status)
            .send_value(serde_json::json!({
                "error": {
                    "kind": error.kind,
                    "message": error.message,
                }
            }));
        status
    }
}
