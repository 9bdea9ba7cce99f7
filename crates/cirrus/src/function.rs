//! The exported function: pipeline plus platform adapter.
//!
//! [`Function`] wraps a [`Pipeline`] and converts between the platform's
//! native invocation (`http::Request` plus [`InvocationContext`]) and the
//! request/response contexts the middleware chain works on.

use crate::invocation::InvocationContext;
use bytes::Bytes;
use cirrus_config::{CorsConfig, ErrorConfig, FunctionConfig};
use cirrus_core::{RequestContext, ResponseContext, ResponseError};
use cirrus_middleware::stages::{CorsStage, ErrorTranslator};
use cirrus_middleware::{BoxFuture, Completion, Handler, Metadata, Pipeline};
use cirrus_telemetry::{fields, invocation_span, log_invocation_complete};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;

/// Request type accepted from the platform.
pub type PlatformRequest = http::Request<Full<Bytes>>;

/// Response type returned to the platform.
pub type PlatformResponse = http::Response<Full<Bytes>>;

/// The callable handed to the hosting platform.
pub type Entrypoint = Arc<
    dyn Fn(PlatformRequest, InvocationContext) -> BoxFuture<'static, Result<PlatformResponse, FunctionError>>
        + Send
        + Sync,
>;

/// Errors returned to the platform instead of a response.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// The response context could not be rendered into an HTTP response.
    #[error("failed to write response: {0}")]
    ResponseWrite(#[from] ResponseError),

    /// Configuration could not be turned into pipeline stages.
    #[error("invalid function configuration: {0}")]
    InvalidConfig(String),
}

/// A handler wrapped in the fixed middleware pipeline.
///
/// Cloning is cheap; clones share the pipeline.
///
/// # Example
///
/// ```
/// use cirrus::prelude::*;
///
/// fn hello<'a>(
///     _req: &'a mut RequestContext,
///     res: &'a mut ResponseContext,
/// ) -> BoxFuture<'a, anyhow::Result<()>> {
///     Box::pin(async move {
///         res.send("hello")?;
///         Ok(())
///     })
/// }
///
/// let function = Function::from_handler(hello, Metadata::default());
/// assert_eq!(
///     function.stage_names(),
///     ["cors", "body_parser", "handler", "error_translator"]
/// );
/// ```
#[derive(Clone)]
pub struct Function {
    pipeline: Arc<Pipeline>,
}

impl Function {
    /// Builds the default pipeline around `handler`.
    pub fn from_handler(handler: impl Handler, metadata: Metadata) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(handler, metadata)),
        }
    }

    /// Builds the pipeline with CORS and error policy taken from `config`.
    pub fn with_config(
        handler: impl Handler,
        metadata: Metadata,
        config: &FunctionConfig,
    ) -> Result<Self, FunctionError> {
        let pipeline = Pipeline::builder(handler)
            .cors(cors_stage(&config.cors)?)
            .translator(error_translator(&config.errors)?)
            .metadata(metadata)
            .build();

        Ok(Self {
            pipeline: Arc::new(pipeline),
        })
    }

    /// Returns the metadata given at build time.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        self.pipeline.metadata()
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    /// Returns the underlying pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs one invocation.
    ///
    /// Handler and middleware failures never surface here; they are rendered
    /// into the response by the error translator. Only a response that cannot
    /// be built is returned as an error.
    pub async fn call(
        &self,
        request: PlatformRequest,
        invocation: InvocationContext,
    ) -> Result<PlatformResponse, FunctionError> {
        let span = invocation_span(invocation.invocation_id(), invocation.function_name());
        self.dispatch(request, invocation).instrument(span).await
    }

    /// Returns a platform-shaped callable sharing this function's pipeline.
    #[must_use]
    pub fn entrypoint(&self) -> Entrypoint {
        let function = self.clone();
        Arc::new(
            move |request: PlatformRequest,
                  invocation: InvocationContext|
                  -> BoxFuture<'static, Result<PlatformResponse, FunctionError>> {
                let function = function.clone();
                Box::pin(async move { function.call(request, invocation).await })
            },
        )
    }

    async fn dispatch(
        &self,
        request: PlatformRequest,
        invocation: InvocationContext,
    ) -> Result<PlatformResponse, FunctionError> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let (invocation_id, _, logger) = invocation.into_parts();
        let mut req = RequestContext::from_parts(parts, body, invocation_id, logger);
        let mut res = ResponseContext::new();

        let completion = self.pipeline.run(&mut req, &mut res).await;
        let status = res.status_code().unwrap_or(StatusCode::OK);

        tracing::Span::current().record(fields::HTTP_STATUS, status.as_u16());
        match completion {
            Completion::Completed => {}
            Completion::Terminated { stage } => {
                tracing::debug!(stage, "invocation ended early");
            }
            Completion::Translated { stage, .. } => {
                tracing::debug!(stage, "invocation failed");
            }
        }
        let duration_ms = u64::try_from(req.elapsed().as_millis()).unwrap_or(u64::MAX);
        log_invocation_complete!(invocation_id, status.as_u16(), duration_ms);

        res.into_http().map_err(|e| {
            tracing::error!(error = %e, "failed to render response");
            FunctionError::from(e)
        })
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("stages", &self.stage_names())
            .field("metadata", self.metadata())
            .finish()
    }
}

fn cors_stage(config: &CorsConfig) -> Result<CorsStage, FunctionError> {
    let methods = config
        .allow_methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.as_bytes())
                .map_err(|_| FunctionError::InvalidConfig(format!("invalid CORS method: {m:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = CorsStage::builder()
        .allow_origin(config.allow_origin.clone())
        .allow_methods(methods)
        .allow_headers(config.allow_headers.iter().cloned())
        .allow_credentials(config.allow_credentials);
    builder = match config.max_age_secs {
        Some(secs) => builder.max_age(Duration::from_secs(secs)),
        None => builder.no_max_age(),
    };

    builder
        .build()
        .map_err(|e| FunctionError::InvalidConfig(format!("invalid CORS header value: {e}")))
}

fn error_translator(config: &ErrorConfig) -> Result<ErrorTranslator, FunctionError> {
    let mut translator = ErrorTranslator::new()
        .expose_internal_errors(config.expose_internal_errors)
        .internal_error_message(config.internal_error_message.clone());

    for (code, status) in &config.kinds {
        let status = StatusCode::from_u16(*status).map_err(|_| {
            FunctionError::InvalidConfig(format!("invalid status {status} for kind {code}"))
        })?;
        translator = translator.register_kind(code.clone(), status);
    }
    Ok(translator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE};

    fn echo<'a>(
        req: &'a mut RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let body = req.json().cloned().unwrap_or_default();
            res.send(&body)?;
            Ok(())
        })
    }

    #[test]
    fn test_metadata_is_retrievable() {
        let function = Function::from_handler(echo, Metadata::new().with("route", "token"));
        assert_eq!(
            function.metadata().get("route"),
            Some(&serde_json::json!("token"))
        );
    }

    #[test]
    fn test_with_config_builds_cors_table() {
        let mut config = FunctionConfig::production();
        config.cors.allow_origin = "https://app.example.com".to_string();
        config.cors.max_age_secs = None;

        let stage = cors_stage(&config.cors).unwrap();
        let table = stage.header_table();
        assert!(table
            .iter()
            .any(|(k, v)| *k == ACCESS_CONTROL_ALLOW_ORIGIN && v == "https://app.example.com"));
        assert!(!table.iter().any(|(k, _)| *k == ACCESS_CONTROL_MAX_AGE));

        assert!(Function::with_config(echo, Metadata::default(), &config).is_ok());
    }

    #[test]
    fn test_with_config_rejects_bad_method() {
        let mut config = FunctionConfig::production();
        config.cors.allow_methods = vec!["NOT A METHOD".to_string()];
        let result = Function::with_config(echo, Metadata::default(), &config);
        assert!(matches!(result, Err(FunctionError::InvalidConfig(_))));
    }

    #[test]
    fn test_error_translator_from_config() {
        let mut config = FunctionConfig::development();
        config.errors.kinds.insert("QUOTA_EXCEEDED".to_string(), 429);

        let translator = error_translator(&config.errors).unwrap();
        assert!(translator.exposes_internal_errors());

        let failure = cirrus_core::Failure::from(cirrus_core::ApiError::custom(
            "QUOTA_EXCEEDED",
            "slow down",
        ));
        assert_eq!(translator.status_for(&failure), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_call_round_trip() {
        let function = Function::from_handler(echo, Metadata::default());
        let request = http::Request::builder()
            .method(Method::POST)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(br#"{"name":"Ada"}"#)))
            .unwrap();

        let response = function
            .call(request, InvocationContext::new("echo"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"name":"Ada"}"#);
    }
}
