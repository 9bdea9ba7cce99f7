//! # Cirrus Middleware
//!
//! The fixed-order middleware chain behind every cirrus function.
//!
//! ## Pipeline Order
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Invocation                          │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ 1. CORS            write header table, answer preflight  │
//! │ 2. Body parse      raw bytes → serde_json::Value         │
//! │ 3. Handler         user function (may call validator)    │
//! └──────────────────────────────────────────────────────────┘
//!                             │ on failure
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ 4. Error translation   status + {"error": {...}} body    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Stages return an explicit [`Outcome`]; the [`Chain`] decides what runs
//! next. The first failure skips every remaining stage and is translated
//! exactly once. Panics inside a stage are caught and translated as internal
//! errors.

#![doc(html_root_url = "https://docs.rs/cirrus-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use chain::{Chain, Completion};
pub use middleware::{BoxFuture, BoxedMiddleware, Middleware, Outcome};
pub use pipeline::{Metadata, Pipeline, PipelineBuilder, Stage};
pub use stages::{handler_fn, Handler};
