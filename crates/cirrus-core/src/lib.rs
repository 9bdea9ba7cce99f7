//! # Cirrus Core
//!
//! Core types shared by every cirrus crate.
//!
//! This crate provides:
//!
//! - **Contexts**: [`RequestContext`] and [`ResponseContext`], the mutable
//!   state passed through every middleware of an invocation
//! - **Errors**: [`ApiError`], [`ErrorKind`] and the [`Failure`] routed to the
//!   error translator
//! - **Logging**: [`Logger`] and the [`LogSink`] capability handed in by the
//!   hosting platform
//! - **Fixtures**: in-memory log sinks for tests
//!
//! ## Example
//!
//! ```
//! use cirrus_core::{ApiError, RequestContext, ResponseContext};
//! use http::{StatusCode, Uri};
//!
//! let req = RequestContext::builder()
//!     .uri(Uri::from_static("/token?name=Ada"))
//!     .build();
//! let mut res = ResponseContext::new();
//!
//! match req.query_param("name") {
//!     Some(name) => {
//!         res.send(&serde_json::json!({ "hello": name })).unwrap();
//!     }
//!     None => {
//!         let err = ApiError::invalid_input("data must have required property 'name'");
//!         assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
//!     }
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/cirrus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod fixtures;
mod log;

pub use context::{
    Body, InvocationId, RequestContext, RequestContextBuilder, ResponseContext, ResponseError,
};
pub use error::{ApiError, ApiResult, ErrorDetail, ErrorEnvelope, ErrorKind, Failure};
pub use log::{LogSink, Logger, TracingSink};
