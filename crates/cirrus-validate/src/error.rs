//! Schema compilation errors.

use thiserror::Error;

/// Errors raised while parsing or compiling a schema.
///
/// These are programmer errors: the schema is wrong, not the data.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema JSON does not have the expected shape.
    #[error("malformed schema: {0}")]
    Malformed(#[source] serde_json::Error),

    /// A property names a format that is not registered.
    #[error("unknown format \"{format}\" on property '{property}'")]
    UnknownFormat {
        /// Property carrying the format.
        property: String,
        /// The unregistered format name.
        format: String,
    },
}
