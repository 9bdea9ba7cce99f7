//! The platform's per-invocation context.

use cirrus_core::{InvocationId, LogSink, Logger};
use std::sync::Arc;

/// What the hosting platform hands over alongside each request: the
/// invocation id, the function name and a logging capability.
///
/// # Example
///
/// ```
/// use cirrus::InvocationContext;
/// use cirrus_core::fixtures::RecordingSink;
/// use std::sync::Arc;
///
/// let sink = Arc::new(RecordingSink::new());
/// let invocation = InvocationContext::new("token").with_sink_arc(sink.clone());
/// invocation.log("cold start");
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct InvocationContext {
    invocation_id: InvocationId,
    function_name: String,
    logger: Logger,
    custom_logger: bool,
}

impl InvocationContext {
    /// Creates a context with a fresh id, logging through `tracing`.
    pub fn new(function_name: impl Into<String>) -> Self {
        let invocation_id = InvocationId::new();
        let function_name = function_name.into();
        let logger = Logger::tracing(invocation_id, function_name.clone());
        Self {
            invocation_id,
            function_name,
            logger,
            custom_logger: false,
        }
    }

    /// Uses the id assigned by the platform.
    ///
    /// The default `tracing` logger is rebuilt so log lines carry the new
    /// id; a sink installed with [`with_sink`](Self::with_sink) is kept.
    #[must_use]
    pub fn with_invocation_id(mut self, invocation_id: InvocationId) -> Self {
        self.invocation_id = invocation_id;
        if !self.custom_logger {
            self.logger = Logger::tracing(invocation_id, self.function_name.clone());
        }
        self
    }

    /// Routes invocation logs to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: impl LogSink) -> Self {
        self.logger = Logger::new(sink);
        self.custom_logger = true;
        self
    }

    /// Routes invocation logs to a shared sink.
    #[must_use]
    pub fn with_sink_arc(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.logger = Logger::from_arc(sink);
        self.custom_logger = true;
        self
    }

    /// Returns the invocation id.
    #[must_use]
    pub const fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Returns the function name.
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Returns the logger.
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Writes an info line through the platform's log capability.
    pub fn log(&self, message: impl AsRef<str>) {
        self.logger.info(message);
    }

    pub(crate) fn into_parts(self) -> (InvocationId, String, Logger) {
        (self.invocation_id, self.function_name, self.logger)
    }
}
