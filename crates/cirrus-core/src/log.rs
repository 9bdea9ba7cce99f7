//! Per-invocation logging sink.
//!
//! Hosting platforms hand each invocation a context with a `log` capability.
//! [`LogSink`] is that capability; [`Logger`] is the cheap, cloneable handle
//! stored on the [`RequestContext`](crate::RequestContext).
//!
//! The default sink, [`TracingSink`], forwards to `tracing` with the
//! invocation id and function name attached as fields.

use crate::context::InvocationId;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Destination for invocation log lines.
pub trait LogSink: Send + Sync + 'static {
    /// Records one message at the given level.
    fn log(&self, level: Level, message: &str);
}

/// Sink that emits `tracing` events.
#[derive(Debug, Clone)]
pub struct TracingSink {
    invocation_id: InvocationId,
    function_name: String,
}

impl TracingSink {
    /// Creates a sink tagged with the invocation id and function name.
    #[must_use]
    pub fn new(invocation_id: InvocationId, function_name: impl Into<String>) -> Self {
        Self {
            invocation_id,
            function_name: function_name.into(),
        }
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        let id = &self.invocation_id;
        let function = self.function_name.as_str();
        match level {
            Level::ERROR => tracing::error!(invocation_id = %id, function, "{message}"),
            Level::WARN => tracing::warn!(invocation_id = %id, function, "{message}"),
            Level::INFO => tracing::info!(invocation_id = %id, function, "{message}"),
            Level::DEBUG => tracing::debug!(invocation_id = %id, function, "{message}"),
            Level::TRACE => tracing::trace!(invocation_id = %id, function, "{message}"),
        }
    }
}

/// Cloneable handle over a [`LogSink`].
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Wraps a sink.
    pub fn new(sink: impl LogSink) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Wraps an already shared sink.
    #[must_use]
    pub fn from_arc(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Creates a logger backed by [`TracingSink`].
    #[must_use]
    pub fn tracing(invocation_id: InvocationId, function_name: impl Into<String>) -> Self {
        Self::new(TracingSink::new(invocation_id, function_name))
    }

    /// Records a message at `level`.
    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        self.sink.log(level, message.as_ref());
    }

    /// Records an info message.
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::INFO, message);
    }

    /// Records a warning.
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::WARN, message);
    }

    /// Records an error.
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::ERROR, message);
    }

    /// Records a debug message.
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::DEBUG, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing(InvocationId::new(), "anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::RecordingSink;

    #[test]
    fn test_logger_forwards_levels() {
        let sink = Arc::new(RecordingSink::new());
        let logger = Logger::from_arc(sink.clone());

        logger.info("hello");
        logger.warn("careful");
        logger.error("boom");

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], (Level::INFO, "hello".to_string()));
        assert_eq!(entries[1].0, Level::WARN);
        assert!(sink.contains(Level::ERROR, "boom"));
    }

    #[test]
    fn test_tracing_sink_does_not_require_subscriber() {
        let logger = Logger::tracing(InvocationId::new(), "token");
        logger.debug("no subscriber installed");
    }

    #[test]
    fn test_clones_share_sink() {
        let sink = Arc::new(RecordingSink::new());
        let logger = Logger::from_arc(sink.clone());
        let clone = logger.clone();
        clone.info("from clone");
        assert!(sink.contains(Level::INFO, "from clone"));
    }
}
