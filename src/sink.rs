//! Injected log sinks.
//!
//! Every component that reports progress or discarded input takes a
//! `&dyn LogSink`. There is no global instance: callers choose where
//! messages go.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Step-level tracing
    Debug,
    /// Normal progress
    Info,
    /// Dropped input, recoverable problems
    Warning,
    /// Failures affecting a document or a write
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Receiver for diagnostic messages.
///
/// `important` marks messages meant for a summary view (structure found,
/// per-document results, final statistics) as opposed to step traces.
pub trait LogSink: Send + Sync {
    /// Record one message.
    fn log(&self, message: &str, severity: Severity, important: bool);

    /// Record a debug message.
    fn debug(&self, message: &str) {
        self.log(message, Severity::Debug, false);
    }

    /// Record an info message.
    fn info(&self, message: &str) {
        self.log(message, Severity::Info, false);
    }

    /// Record a warning.
    fn warning(&self, message: &str) {
        self.log(message, Severity::Warning, false);
    }

    /// Record an error.
    fn error(&self, message: &str) {
        self.log(message, Severity::Error, false);
    }
}

impl<F> LogSink for F
where
    F: Fn(&str, Severity, bool) + Send + Sync,
{
    fn log(&self, message: &str, severity: Severity, important: bool) {
        self(message, severity, important)
    }
}

/// Forwards to the `log` facade under the `unfold` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, message: &str, severity: Severity, _important: bool) {
        match severity {
            Severity::Debug => log::debug!(target: "unfold", "{}", message),
            Severity::Info => log::info!(target: "unfold", "{}", message),
            Severity::Warning => log::warn!(target: "unfold", "{}", message),
            Severity::Error => log::error!(target: "unfold", "{}", message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _message: &str, _severity: Severity, _important: bool) {}
}

/// A message captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Message text
    pub message: String,
    /// Severity
    pub severity: Severity,
    /// Summary-level flag
    pub important: bool,
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Records at exactly `severity`.
    pub fn with_severity(&self, severity: Severity) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.severity == severity)
            .collect()
    }

    /// Number of records whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| r.message.contains(needle))
            .count()
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str, severity: Severity, important: bool) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(LogRecord {
                message: message.to_string(),
                severity,
                important,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_memory_sink_records() {
        let sink = MemorySink::new();
        sink.info("structure found");
        sink.warning("discarded block");
        sink.log("done", Severity::Info, true);

        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.with_severity(Severity::Warning).len(), 1);
        assert_eq!(sink.count_containing("block"), 1);
        assert!(sink.records()[2].important);

        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_closure_sink() {
        let warnings = AtomicUsize::new(0);
        let sink = |_: &str, severity: Severity, _: bool| {
            if severity == Severity::Warning {
                warnings.fetch_add(1, Ordering::SeqCst);
            }
        };
        sink.warning("a");
        sink.debug("b");
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Debug < Severity::Warning);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
