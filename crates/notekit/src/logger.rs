//! Injectable logging service
//!
//! [`Logger`] is constructed once by the embedding application and handed to
//! the registry, providers and importer. It forwards to `tracing` by default;
//! tests swap in a [`MemorySink`] to inspect what was logged. Debug output is
//! gated by a flag that can be flipped at runtime (the host's debug setting).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Destination for log records
pub trait LogSink: Send + Sync {
    fn record(&self, level: LogLevel, message: &str);
}

/// Forwards records to `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "notekit", "{}", message),
            LogLevel::Info => tracing::info!(target: "notekit", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "notekit", "{}", message),
            LogLevel::Error => tracing::error!(target: "notekit", "{}", message),
        }
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// True if any record contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn record(&self, level: LogLevel, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}

/// Cheaply cloneable logging handle; clones share the sink and debug flag
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    debug: Arc<AtomicBool>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("debug", &self.is_debug())
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Create a logger writing to `sink` with debug output disabled
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            debug: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Logger backed by `tracing`
    pub fn tracing() -> Self {
        Self::default()
    }

    /// Toggle debug output for this logger and all its clones
    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Emitted only while debug output is enabled
    pub fn debug(&self, message: impl AsRef<str>) {
        if self.is_debug() {
            self.sink.record(LogLevel::Debug, message.as_ref());
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.record(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink.record(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.sink.record(LogLevel::Error, message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_gated_by_flag() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone());

        logger.debug("hidden");
        logger.info("shown");
        assert_eq!(sink.records(), vec![(LogLevel::Info, "shown".to_string())]);

        logger.set_debug(true);
        logger.debug("now visible");
        assert!(sink.contains("now visible"));
    }

    #[test]
    fn test_clones_share_debug_flag() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone());
        let clone = logger.clone();

        logger.set_debug(true);
        assert!(clone.is_debug());
        clone.debug("from clone");
        assert!(sink.contains("from clone"));
    }

    #[test]
    fn test_levels_recorded() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone());

        logger.warn("careful");
        logger.error("broken");

        let records = sink.records();
        assert_eq!(records[0].0, LogLevel::Warn);
        assert_eq!(records[1], (LogLevel::Error, "broken".to_string()));
    }
}
