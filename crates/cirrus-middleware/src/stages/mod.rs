//! Built-in pipeline stages.
//!
//! 1. [`cors`] - CORS header table and preflight answers
//! 2. [`body_parser`] - in-place body decoding
//! 3. [`handler`] - the user function
//! 4. [`error_translator`] - failure to HTTP response

pub mod body_parser;
pub mod cors;
pub mod error_translator;
pub mod handler;

pub use body_parser::BodyParser;
pub use cors::{CorsBuilder, CorsStage};
pub use error_translator::{ErrorTranslator, TranslatedError, INTERNAL_ERROR_MESSAGE};
pub use handler::{handler_fn, Handler, HandlerStage};
