//! User handler stage.
//!
//! A [`Handler`] is the function a cirrus function exports. It receives both
//! contexts and returns `anyhow::Result<()>`, so `?` works on any error.
//! Returning an [`ApiError`](cirrus_core::ApiError) (directly or wrapped in
//! `anyhow` context) keeps its kind; anything else becomes an unclassified
//! internal failure.
//!
//! # Example
//!
//! ```
//! use cirrus_core::{RequestContext, ResponseContext};
//! use cirrus_middleware::{handler_fn, BoxFuture};
//!
//! fn hello<'a>(
//!     _req: &'a mut RequestContext,
//!     res: &'a mut ResponseContext,
//! ) -> BoxFuture<'a, anyhow::Result<()>> {
//!     Box::pin(async move {
//!         res.send("hello")?;
//!         Ok(())
//!     })
//! }
//!
//! let closure = handler_fn(|_req, res| {
//!     Box::pin(async move {
//!         res.send(&serde_json::json!({"data": "ok"}))?;
//!         Ok(())
//!     })
//! });
//! # let _ = (hello, closure);
//! ```

use crate::middleware::{BoxFuture, Middleware, Outcome};
use cirrus_core::{RequestContext, ResponseContext};
use std::sync::Arc;

/// An async request handler.
pub trait Handler: Send + Sync + 'static {
    /// Handles one invocation.
    fn call<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut ResponseContext) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        self(req, res)
    }
}

/// Pins down the signature of a handler closure.
///
/// Closures passed straight to a generic `H: Handler` parameter cannot infer
/// the higher-ranked lifetimes; routing them through this function can.
pub fn handler_fn<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut ResponseContext) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    f
}

/// Stage that runs the user handler.
#[derive(Clone)]
pub struct HandlerStage {
    handler: Arc<dyn Handler>,
}

impl HandlerStage {
    /// Wraps a handler.
    pub fn new(handler: impl Handler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Wraps an already shared handler.
    #[must_use]
    pub fn from_arc(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }
}

impl std::fmt::Debug for HandlerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerStage").finish_non_exhaustive()
    }
}

impl Middleware for HandlerStage {
    fn name(&self) -> &'static str {
        "handler"
    }

    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move { Outcome::from_result(self.handler.call(req, res).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::{ApiError, ErrorKind, Failure};
    use serde_json::json;

    struct Greeter;

    impl Handler for Greeter {
        fn call<'a>(
            &'a self,
            req: &'a mut RequestContext,
            res: &'a mut ResponseContext,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                let name = req
                    .query_param("name")
                    .ok_or_else(|| ApiError::invalid_input("name is required"))?
                    .to_string();
                res.send(&json!({ "hello": name }))?;
                Ok(())
            })
        }
    }

    fn broken<'a>(
        _req: &'a mut RequestContext,
        _res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Err(anyhow::anyhow!("disk full")) })
    }

    #[tokio::test]
    async fn test_ok_continues() {
        let stage = HandlerStage::new(Greeter);
        let mut req = RequestContext::builder().query("name", "Ada").build();
        let mut res = ResponseContext::new();

        assert!(stage.handle(&mut req, &mut res).await.is_continue());
        assert_eq!(res.body(), Some(&json!({"hello": "Ada"})));
    }

    #[tokio::test]
    async fn test_api_error_keeps_kind() {
        let stage = HandlerStage::new(Greeter);
        let mut req = RequestContext::builder().build();
        let mut res = ResponseContext::new();

        let outcome = stage.handle(&mut req, &mut res).await;
        assert!(matches!(outcome, Outcome::Fail(ref f) if f.kind() == ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_foreign_error_is_unclassified() {
        let stage = HandlerStage::new(broken);
        let mut req = RequestContext::builder().build();
        let mut res = ResponseContext::new();

        let outcome = stage.handle(&mut req, &mut res).await;
        assert!(matches!(outcome, Outcome::Fail(Failure::Unclassified(_))));
    }

    #[tokio::test]
    async fn test_handler_fn_closure() {
        let stage = HandlerStage::new(handler_fn(|req, res| {
            Box::pin(async move {
                let echoed = req.query_value();
                res.send(&echoed)?;
                Ok(())
            })
        }));
        let mut req = RequestContext::builder().query("k", "v").build();
        let mut res = ResponseContext::new();

        assert!(stage.handle(&mut req, &mut res).await.is_continue());
        assert_eq!(res.body(), Some(&json!({"k": "v"})));
    }
}
