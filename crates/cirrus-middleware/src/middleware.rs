//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait every stage implements and
//! the [`Outcome`] a stage hands back to the [`Chain`](crate::Chain).
//!
//! # Design
//!
//! Stages do not call each other. Each one reads the request context, writes
//! to the response context and returns an explicit outcome; the chain alone
//! decides what runs next. Short-circuiting and error diversion are therefore
//! data, not control flow hidden in a `next` callback.
//!
//! # Example
//!
//! ```
//! use cirrus_core::{RequestContext, ResponseContext};
//! use cirrus_middleware::{BoxFuture, Middleware, Outcome};
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered_by"
//!     }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         _req: &'a mut RequestContext,
//!         res: &'a mut ResponseContext,
//!     ) -> BoxFuture<'a, Outcome> {
//!         Box::pin(async move { Outcome::from_result(res.set_header("x-powered-by", "cirrus")) })
//!     }
//! }
//! ```

use cirrus_core::{Failure, RequestContext, ResponseContext};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// What a stage tells the chain to do next.
#[derive(Debug)]
pub enum Outcome {
    /// Run the next stage.
    Continue,
    /// Skip every remaining stage and translate the failure.
    Fail(Failure),
    /// The response is complete; end the chain successfully.
    Terminate,
}

impl Outcome {
    /// Maps `Ok` to [`Outcome::Continue`] and `Err` to [`Outcome::Fail`].
    pub fn from_result<T, E: Into<Failure>>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Continue,
            Err(err) => Self::Fail(err.into()),
        }
    }

    /// Creates a failure outcome.
    pub fn fail(failure: impl Into<Failure>) -> Self {
        Self::Fail(failure.into())
    }

    /// Returns `true` for [`Outcome::Continue`].
    #[must_use]
    pub const fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// A unit of request processing.
///
/// # Invariants
///
/// - A stage MUST NOT write an error response itself; it returns
///   [`Outcome::Fail`] and leaves formatting to the error translator
/// - A stage MUST NOT hold on to either context after its future resolves
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name used in logs.
    fn name(&self) -> &'static str;

    /// Processes one invocation.
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, Outcome>;
}
