//! Test fixtures for cirrus development and testing.
//!
//! # Example
//!
//! ```
//! use cirrus_core::fixtures::recording_logger;
//! use tracing::Level;
//!
//! let (logger, sink) = recording_logger();
//! logger.error("handler failed");
//! assert!(sink.contains(Level::ERROR, "handler failed"));
//! ```

use crate::log::{LogSink, Logger};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::Level;

/// A [`LogSink`] that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded entries in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().clone()
    }

    /// Returns `true` if a message at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: Level, message: &str) {
        self.entries.lock().push((level, message.to_string()));
    }
}

/// Creates a [`Logger`] backed by a fresh [`RecordingSink`].
#[must_use]
pub fn recording_logger() -> (Logger, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    (Logger::from_arc(sink.clone()), sink)
}
