//! Request and response context types.
//!
//! A [`RequestContext`] and a [`ResponseContext`] are created for every
//! invocation and handed to each middleware in turn. They are owned by that
//! invocation alone and dropped when it completes.

use crate::log::Logger;
use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

/// A unique identifier for each invocation, using UUID v7.
///
/// # Example
///
/// ```
/// use cirrus_core::InvocationId;
///
/// let id = InvocationId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Creates a new time-ordered invocation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an id from an existing UUID, e.g. one supplied by the platform.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for InvocationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Request body, raw until the body parser replaces it in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Bytes as received from the platform.
    Raw(Bytes),
    /// Decoded body.
    Parsed(Value),
}

impl Body {
    /// Returns the parsed value, if the body has been parsed.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw bytes, if the body has not been parsed.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Parsed(_) => None,
        }
    }

    /// Returns `true` once the body parser has run successfully.
    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Raw(Bytes::new())
    }
}

/// The inbound side of one invocation.
///
/// # Example
///
/// ```
/// use cirrus_core::RequestContext;
/// use http::{Method, Uri};
///
/// let req = RequestContext::builder()
///     .method(Method::POST)
///     .uri(Uri::from_static("/api/token?name=Ada&age=30"))
///     .build();
///
/// assert_eq!(req.query_param("name"), Some("Ada"));
/// assert_eq!(req.query_value()["age"], "30");
/// ```
#[derive(Debug)]
pub struct RequestContext {
    invocation_id: InvocationId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: BTreeMap<String, String>,
    body: Body,
    logger: Logger,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a builder, mostly useful for tests and platform adapters.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Adapts the parts of an `http::Request` into a context.
    ///
    /// Query parameters are decoded from the URI; a malformed query string
    /// yields no parameters.
    #[must_use]
    pub fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        invocation_id: InvocationId,
        logger: Logger,
    ) -> Self {
        let query = parse_query(&parts.uri);
        Self {
            invocation_id,
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            query,
            body: Body::Raw(body),
            logger,
            started_at: Instant::now(),
        }
    }

    /// Returns the invocation id.
    #[must_use]
    pub const fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns all request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup. Non-UTF-8 values are skipped.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the decoded query parameters.
    #[must_use]
    pub const fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Returns a single query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns the query parameters as a JSON object of strings, ready for
    /// schema validation.
    #[must_use]
    pub fn query_value(&self) -> Value {
        Value::Object(
            self.query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the parsed body, if the body parser has run.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        self.body.as_json()
    }

    /// Replaces the raw body with its decoded form.
    pub fn set_parsed_body(&mut self, value: Value) {
        self.body = Body::Parsed(value);
    }

    /// Returns the logger attached to this invocation.
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Logs an info message through the invocation's sink.
    pub fn log(&self, message: impl AsRef<str>) {
        self.logger.info(message);
    }

    /// Returns the time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// Builder for [`RequestContext`].
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    invocation_id: Option<InvocationId>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extra_query: Vec<(String, String)>,
    body: Bytes,
    logger: Option<Logger>,
}

impl RequestContextBuilder {
    /// Sets the invocation id. A fresh one is generated otherwise.
    #[must_use]
    pub fn invocation_id(mut self, id: InvocationId) -> Self {
        self.invocation_id = Some(id);
        self
    }

    /// Sets the method. Defaults to `GET`.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI. Its query string is decoded into query parameters.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds a query parameter on top of those in the URI.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_query.push((name.into(), value.into()));
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and its content type.
    #[must_use]
    pub fn json(mut self, value: &Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    /// Sets the logger. Defaults to a `tracing`-backed logger.
    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> RequestContext {
        let invocation_id = self.invocation_id.unwrap_or_default();
        let mut query = parse_query(&self.uri);
        query.extend(self.extra_query);
        RequestContext {
            invocation_id,
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            query,
            body: Body::Raw(self.body),
            logger: self
                .logger
                .unwrap_or_else(|| Logger::tracing(invocation_id, "anonymous")),
            started_at: Instant::now(),
        }
    }
}

fn parse_query(uri: &Uri) -> BTreeMap<String, String> {
    uri.query()
        .map(|q| {
            serde_urlencoded::from_str::<Vec<(String, String)>>(q)
                .unwrap_or_default()
                .into_iter()
                .collect()
        })
        .unwrap_or_default()
}

/// Errors raised while writing to a [`ResponseContext`] or rendering it.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Header name is not a valid HTTP token.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] InvalidHeaderName),

    /// Header value contains forbidden bytes.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),

    /// Body could not be serialized.
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The HTTP response could not be assembled.
    #[error("failed to build response: {0}")]
    Build(#[from] http::Error),
}

/// The outbound side of one invocation.
///
/// # Example
///
/// ```
/// use cirrus_core::ResponseContext;
/// use http::StatusCode;
///
/// let mut res = ResponseContext::new();
/// res.set_header("Authorization", "token").unwrap();
/// res.status(StatusCode::CREATED).send(&serde_json::json!({"data": "ok"})).unwrap();
///
/// assert_eq!(res.header("authorization"), Some("token"));
/// assert_eq!(res.status_code(), Some(StatusCode::CREATED));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Option<Value>,
    sealed_headers: Option<HeaderMap>,
}

impl ResponseContext {
    /// Creates an empty response with no status set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status code.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    /// Returns the status code, if a middleware has set one.
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Sets a header from strings, replacing any previous value for the key.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, ResponseError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets an already validated header, replacing any previous value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns all headers written so far.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Serializes `body` and stores it. The last call wins.
    pub fn send<T: Serialize + ?Sized>(&mut self, body: &T) -> Result<&mut Self, ResponseError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Stores an already built JSON body.
    pub fn send_value(&mut self, body: Value) -> &mut Self {
        self.body = Some(body);
        self
    }

    /// Returns the body, if one was sent.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Marks the headers written so far as the set every error response
    /// keeps.
    pub fn seal_headers(&mut self) -> &mut Self {
        self.sealed_headers = Some(self.headers.clone());
        self
    }

    /// Rewinds the response to its sealed headers, dropping every header
    /// written since, the body and the status.
    ///
    /// Without a seal, all headers are dropped.
    pub fn reset_to_sealed(&mut self) -> &mut Self {
        self.headers = self.sealed_headers.clone().unwrap_or_default();
        self.body = None;
        self.status = None;
        self
    }

    /// Renders the response for the platform.
    ///
    /// An unset status becomes `200 OK`. String bodies are sent as
    /// `text/plain`, every other value as JSON. A `content-type` written by a
    /// middleware is kept.
    pub fn into_http(self) -> Result<http::Response<Full<Bytes>>, ResponseError> {
        let status = self.status.unwrap_or(StatusCode::OK);
        let (bytes, content_type) = match self.body {
            None => (Bytes::new(), None),
            Some(Value::String(text)) => (Bytes::from(text), Some("text/plain; charset=utf-8")),
            Some(value) => (
                Bytes::from(serde_json::to_vec(&value)?),
                Some("application/json"),
            ),
        };

        let mut builder = http::Response::builder().status(status);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
            if let Some(content_type) = content_type {
                headers
                    .entry(header::CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static(content_type));
            }
        }
        Ok(builder.body(Full::new(bytes))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_invocation_ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }

    #[test]
    fn test_query_is_decoded_from_uri() {
        let req = RequestContext::builder()
            .uri(Uri::from_static("/token?name=Ada%20Lovelace&age=36"))
            .build();
        assert_eq!(req.query_param("name"), Some("Ada Lovelace"));
        assert_eq!(req.query_param("age"), Some("36"));
        assert_eq!(req.query().len(), 2);
    }

    #[test]
    fn test_query_value_is_object_of_strings() {
        let req = RequestContext::builder().query("age", "30").build();
        assert_eq!(req.query_value(), serde_json::json!({"age": "30"}));
    }

    #[test]
    fn test_from_parts_keeps_method_and_headers() {
        let (parts, ()) = http::Request::builder()
            .method(Method::PUT)
            .uri("/items?id=7")
            .header("X-Trace", "abc")
            .body(())
            .unwrap()
            .into_parts();

        let req = RequestContext::from_parts(
            parts,
            Bytes::from_static(b"payload"),
            InvocationId::new(),
            Logger::default(),
        );
        assert_eq!(req.method(), Method::PUT);
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert_eq!(req.query_param("id"), Some("7"));
        assert_eq!(req.body().as_bytes().map(|b| b.as_ref()), Some(&b"payload"[..]));
    }

    #[test]
    fn test_set_parsed_body_replaces_raw() {
        let mut req = RequestContext::builder().body("{}").build();
        assert!(!req.body().is_parsed());
        req.set_parsed_body(serde_json::json!({"a": 1}));
        assert_eq!(req.json(), Some(&serde_json::json!({"a": 1})));
        assert!(req.body().as_bytes().is_none());
    }

    #[test]
    fn test_header_last_write_wins() {
        let mut res = ResponseContext::new();
        res.set_header("Access-Control-Allow-Origin", "*").unwrap();
        res.set_header("access-control-allow-origin", "https://app.example.com")
            .unwrap();
        assert_eq!(
            res.header("access-control-allow-origin"),
            Some("https://app.example.com")
        );
        assert_eq!(res.headers().len(), 1);
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let mut res = ResponseContext::new();
        assert!(matches!(
            res.set_header("bad header", "x"),
            Err(ResponseError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            res.set_header("x-ok", "line\nbreak"),
            Err(ResponseError::InvalidHeaderValue(_))
        ));
    }

    #[test]
    fn test_reset_to_sealed_drops_later_headers() {
        let mut res = ResponseContext::new();
        res.set_header("access-control-allow-origin", "*").unwrap();
        res.seal_headers();
        res.set_header("authorization", "secret-token").unwrap();
        res.set_header("set-cookie", "session=abc").unwrap();
        res.status(StatusCode::OK).send("partial").unwrap();

        res.reset_to_sealed();

        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        assert!(res.header("authorization").is_none());
        assert!(res.header("set-cookie").is_none());
        assert!(res.body().is_none());
        assert!(res.status_code().is_none());
    }

    #[test]
    fn test_reset_without_seal_drops_all_headers() {
        let mut res = ResponseContext::new();
        res.set_header("x-partial", "1").unwrap();
        res.reset_to_sealed();
        assert!(res.headers().is_empty());
    }

    #[test]
    fn test_send_last_writer_wins() {
        let mut res = ResponseContext::new();
        res.send(&serde_json::json!({"first": true})).unwrap();
        res.send(&serde_json::json!({"second": true})).unwrap();
        assert_eq!(res.body(), Some(&serde_json::json!({"second": true})));
    }

    #[tokio::test]
    async fn test_into_http_defaults_to_200_json() {
        let mut res = ResponseContext::new();
        res.send(&serde_json::json!({"data": "token generated"})).unwrap();
        let response = res.into_http().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"data":"token generated"}"#);
    }

    #[test]
    fn test_into_http_string_body_is_text() {
        let mut res = ResponseContext::new();
        res.send("hello").unwrap();
        let response = res.into_http().unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_into_http_keeps_explicit_content_type() {
        let mut res = ResponseContext::new();
        res.set_header("content-type", "application/problem+json").unwrap();
        res.send(&serde_json::json!({})).unwrap();
        let response = res.into_http().unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_into_http_without_body_has_no_content_type() {
        let mut res = ResponseContext::new();
        res.status(StatusCode::NO_CONTENT);
        let response = res.into_http().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
