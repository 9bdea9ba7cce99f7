//! Error types for cirrus functions.
//!
//! Two layers of error flow through a pipeline:
//!
//! - [`ApiError`] is the structured, classified failure. It carries an
//!   [`ErrorKind`], a human-readable message and an optional explicit HTTP
//!   status. Validators and handlers raise it when they know what went wrong.
//! - [`Failure`] is what the executor actually routes to the error
//!   translator. It is either a recognised [`ApiError`] or an unclassified
//!   [`anyhow::Error`] (a bug, an unexpected I/O error, a panic).
//!
//! Handlers return `anyhow::Result<()>`, so `?` works on any error type.
//! Converting an `anyhow::Error` into a [`Failure`] downcasts it back into an
//! [`ApiError`] when that is what it wraps.
//!
//! # Kind to status mapping
//!
//! | `ErrorKind` | Code | Status |
//! |---|---|---|
//! | `InvalidInput` | `INVALID_INPUT` | 400 |
//! | `Unauthorized` | `UNAUTHORIZED` | 401 |
//! | `Forbidden` | `FORBIDDEN` | 403 |
//! | `NotFound` | `NOT_FOUND` | 404 |
//! | `Conflict` | `CONFLICT` | 409 |
//! | `Internal` | `INTERNAL_ERROR` | 500 |
//! | `Custom(_)` | the custom code | registered on the translator |

use crate::context::ResponseError;
use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Classification tag of a structured error.
///
/// Serialized as its `SCREAMING_SNAKE_CASE` code, e.g. `"INVALID_INPUT"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input failed validation.
    InvalidInput,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Authenticated but not allowed.
    Forbidden,
    /// Resource not found.
    NotFound,
    /// Conflicting state (e.g. duplicate resource).
    Conflict,
    /// Internal or unclassified failure.
    Internal,
    /// Application-defined kind. Its status comes from the translator's
    /// registry or from the error's explicit status code.
    Custom(String),
}

impl ErrorKind {
    /// Returns the wire code for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL_ERROR",
            Self::Custom(code) => code,
        }
    }

    /// Parses a wire code. Unknown codes become [`ErrorKind::Custom`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "INVALID_INPUT" => Self::InvalidInput,
            "UNAUTHORIZED" => Self::Unauthorized,
            "FORBIDDEN" => Self::Forbidden,
            "NOT_FOUND" => Self::NotFound,
            "CONFLICT" => Self::Conflict,
            "INTERNAL_ERROR" => Self::Internal,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Returns the built-in HTTP status for this kind.
    ///
    /// Custom kinds have no built-in status.
    #[must_use]
    pub const fn default_status_code(&self) -> Option<StatusCode> {
        match self {
            Self::InvalidInput => Some(StatusCode::BAD_REQUEST),
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden => Some(StatusCode::FORBIDDEN),
            Self::NotFound => Some(StatusCode::NOT_FOUND),
            Self::Conflict => Some(StatusCode::CONFLICT),
            Self::Internal => Some(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Custom(_) => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// A classified failure raised by a validator, handler or stage.
///
/// Serializes to `{"kind": "...", "message": "...", "statusCode": 400?}`.
///
/// # Example
///
/// ```
/// use cirrus_core::{ApiError, ErrorKind};
/// use http::StatusCode;
///
/// let err = ApiError::invalid_input("data must have required property 'name'");
/// assert_eq!(err.kind(), &ErrorKind::InvalidInput);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
///
/// let quota = ApiError::custom("QUOTA_EXCEEDED", "daily quota used up")
///     .with_status(StatusCode::TOO_MANY_REQUESTS);
/// assert_eq!(quota.status_code(), StatusCode::TOO_MANY_REQUESTS);
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
}

impl ApiError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates an `INVALID_INPUT` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Creates an `UNAUTHORIZED` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Creates a `FORBIDDEN` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Creates a `NOT_FOUND` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a `CONFLICT` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Creates an `INTERNAL_ERROR` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Creates an error with an application-defined kind code.
    #[must_use]
    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_code(&code.into()), message)
    }

    /// Pins the HTTP status for this error, overriding the kind mapping.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status_code = Some(status.as_u16());
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the explicitly pinned status, if any.
    #[must_use]
    pub fn explicit_status(&self) -> Option<StatusCode> {
        self.status_code
            .and_then(|code| StatusCode::from_u16(code).ok())
    }

    /// Returns the effective status: the pinned status, else the kind's
    /// built-in status, else 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.explicit_status()
            .or_else(|| self.kind.default_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// A failure routed to the error translator.
#[derive(Debug)]
pub enum Failure {
    /// A recognised structured error.
    Api(ApiError),
    /// Anything else. Treated as an internal error.
    Unclassified(anyhow::Error),
}

impl Failure {
    /// Wraps any error as an unclassified failure without downcasting.
    pub fn unclassified(error: impl Into<anyhow::Error>) -> Self {
        Self::Unclassified(error.into())
    }

    /// Builds an unclassified failure from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>, stage: &str) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Unclassified(anyhow::anyhow!("stage '{stage}' panicked: {detail}"))
    }

    /// Returns the structured error, if this failure is classified.
    #[must_use]
    pub const fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Unclassified(_) => None,
        }
    }

    /// Returns the kind reported to callers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(err) => err.kind().clone(),
            Self::Unclassified(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` for unclassified failures and `INTERNAL_ERROR` kinds.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(err) => write!(f, "{err}"),
            Self::Unclassified(err) => write!(f, "{err:#}"),
        }
    }
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<ResponseError> for Failure {
    fn from(err: ResponseError) -> Self {
        Self::Unclassified(err.into())
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => Self::Api(api),
            Err(other) => Self::Unclassified(other),
        }
    }
}

/// Serializable error body written by the error translator.
///
/// ```json
/// {"error": {"kind": "INVALID_INPUT", "message": "..."}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// Error detail within an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable kind code.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorEnvelope {
    /// Creates an envelope.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_maps_to_400() {
        let err = ApiError::invalid_input("bad name");
        assert_eq!(err.kind(), &ErrorKind::InvalidInput);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "INVALID_INPUT: bad name");
    }

    #[test]
    fn test_all_builtin_kinds_have_error_status() {
        let kinds = [
            ErrorKind::InvalidInput,
            ErrorKind::Unauthorized,
            ErrorKind::Forbidden,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Internal,
        ];

        for kind in kinds {
            let status = kind.default_status_code().expect("built-in kind");
            assert!(
                status.is_client_error() || status.is_server_error(),
                "kind {kind} should map to an error status, got {status}"
            );
            assert_eq!(ErrorKind::from_code(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_custom_kind_without_status_defaults_to_500() {
        let err = ApiError::custom("PAYMENT_REQUIRED", "card declined");
        assert_eq!(err.kind(), &ErrorKind::Custom("PAYMENT_REQUIRED".into()));
        assert!(err.explicit_status().is_none());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_explicit_status_wins_over_kind() {
        let err = ApiError::not_found("gone").with_status(StatusCode::GONE);
        assert_eq!(err.status_code(), StatusCode::GONE);
    }

    #[test]
    fn test_api_error_serialization_shape() {
        let err = ApiError::invalid_input("bad").with_status(StatusCode::UNPROCESSABLE_ENTITY);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "INVALID_INPUT", "message": "bad", "statusCode": 422})
        );

        let plain = serde_json::to_value(ApiError::conflict("dup")).unwrap();
        assert!(plain.get("statusCode").is_none());

        let parsed: ApiError = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_anyhow_downcasts_to_api_failure() {
        let err: anyhow::Error = ApiError::forbidden("nope").into();
        let failure = Failure::from(err);
        assert!(matches!(failure, Failure::Api(ref e) if e.kind() == &ErrorKind::Forbidden));
        assert!(!failure.is_internal());
    }

    #[test]
    fn test_anyhow_with_context_still_downcasts() {
        let err = anyhow::Error::new(ApiError::invalid_input("age")).context("loading profile");
        let failure = Failure::from(err);
        assert_eq!(failure.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_foreign_error_is_unclassified() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let failure = Failure::from(anyhow::Error::from(io));
        assert!(matches!(failure, Failure::Unclassified(_)));
        assert_eq!(failure.kind(), ErrorKind::Internal);
        assert!(failure.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_panic_payload_is_captured() {
        let failure = Failure::from_panic(Box::new("index out of bounds"), "handler");
        let text = failure.to_string();
        assert!(text.contains("handler"));
        assert!(text.contains("index out of bounds"));

        let failure = Failure::from_panic(Box::new(String::from("owned")), "cors");
        assert!(failure.to_string().contains("owned"));
    }

    #[test]
    fn test_error_envelope_serialization() {
        let envelope = ErrorEnvelope::new("INVALID_INPUT", "missing name");
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"error":{"kind":"INVALID_INPUT","message":"missing name"}}"#
        );
    }
}
