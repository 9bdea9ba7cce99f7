//! CORS header stage.
//!
//! Writes a static table of CORS headers on every invocation, before any
//! other stage runs, so success and error responses alike carry them.
//!
//! An `OPTIONS` request is treated as a preflight: the stage answers it with
//! `204 No Content` and terminates the chain without calling the handler.
//!
//! ## CORS Headers
//!
//! - `Access-Control-Allow-Origin`
//! - `Access-Control-Allow-Methods`
//! - `Access-Control-Allow-Headers`
//! - `Access-Control-Allow-Credentials` (only when enabled)
//! - `Access-Control-Max-Age` (only when set)
//!
//! ## Example
//!
//! ```
//! use cirrus_middleware::stages::CorsStage;
//! use http::Method;
//! use std::time::Duration;
//!
//! let cors = CorsStage::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_methods([Method::GET, Method::POST])
//!     .allow_headers(["Content-Type", "Authorization"])
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(600))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cors.header_table().len(), 5);
//! ```

use crate::middleware::{BoxFuture, Middleware, Outcome};
use cirrus_core::{RequestContext, ResponseContext};
use http::header::{HeaderName, HeaderValue, InvalidHeaderValue};
use http::{Method, StatusCode};
use std::time::Duration;

/// CORS header names.
pub mod headers {
    pub use http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS as ALLOW_CREDENTIALS,
        ACCESS_CONTROL_ALLOW_HEADERS as ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS as ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN as ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE as MAX_AGE,
    };
}

/// Default allowed methods.
pub const DEFAULT_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Stage that applies a fixed CORS header table.
#[derive(Debug, Clone)]
pub struct CorsStage {
    table: Vec<(HeaderName, HeaderValue)>,
}

/// Builder for [`CorsStage`].
#[derive(Debug, Clone)]
pub struct CorsBuilder {
    allow_origin: String,
    allow_methods: Vec<Method>,
    allow_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl Default for CorsBuilder {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: DEFAULT_METHODS.to_vec(),
            allow_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            allow_credentials: false,
            max_age: Some(Duration::from_secs(86400)),
        }
    }
}

impl CorsBuilder {
    /// Creates a builder with permissive defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allowed origin (`*` by default).
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    /// Replaces the allowed methods.
    #[must_use]
    pub fn allow_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.allow_methods = methods.into_iter().collect();
        self
    }

    /// Replaces the allowed request headers.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether to send `Access-Control-Allow-Credentials: true`.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Sets the preflight cache duration.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.max_age = Some(duration);
        self
    }

    /// Omits `Access-Control-Max-Age`.
    #[must_use]
    pub fn no_max_age(mut self) -> Self {
        self.max_age = None;
        self
    }

    /// Builds the stage, validating every header value.
    pub fn build(self) -> Result<CorsStage, InvalidHeaderValue> {
        let methods = self
            .allow_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let mut table = vec![
            (headers::ALLOW_ORIGIN, HeaderValue::from_str(&self.allow_origin)?),
            (headers::ALLOW_METHODS, HeaderValue::from_str(&methods)?),
            (
                headers::ALLOW_HEADERS,
                HeaderValue::from_str(&self.allow_headers.join(", "))?,
            ),
        ];
        if self.allow_credentials {
            table.push((headers::ALLOW_CREDENTIALS, HeaderValue::from_static("true")));
        }
        if let Some(max_age) = self.max_age {
            table.push((headers::MAX_AGE, HeaderValue::from(max_age.as_secs())));
        }

        Ok(CorsStage { table })
    }
}

impl CorsStage {
    /// Creates a CORS builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Creates a stage allowing any origin with the default methods and
    /// headers.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            table: vec![
                (headers::ALLOW_ORIGIN, HeaderValue::from_static("*")),
                (
                    headers::ALLOW_METHODS,
                    HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
                ),
                (
                    headers::ALLOW_HEADERS,
                    HeaderValue::from_static("Content-Type, Authorization"),
                ),
                (headers::MAX_AGE, HeaderValue::from_static("86400")),
            ],
        }
    }

    /// Returns the headers written on every response.
    #[must_use]
    pub fn header_table(&self) -> &[(HeaderName, HeaderValue)] {
        &self.table
    }
}

impl Default for CorsStage {
    fn default() -> Self {
        Self::permissive()
    }
}

impl Middleware for CorsStage {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            for (name, value) in &self.table {
                res.insert_header(name.clone(), value.clone());
            }
            res.seal_headers();

            if req.method() == Method::OPTIONS {
                res.status(StatusCode::NO_CONTENT);
                return Outcome::Terminate;
            }
            Outcome::Continue
        })
    }
}
