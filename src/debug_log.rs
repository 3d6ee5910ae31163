//! Per-source debug channel
//!
//! Book sources are written by hand and break often, so every stage of chapter
//! assembly reports what it did through a [`DebugLog`]. Recording is synchronous and
//! must never fail or block the pipeline.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

/// Severity of a debug record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink for per-source debug messages
pub trait DebugLog: Send + Sync {
    fn record(&self, source_key: &str, message: &str, severity: Severity);
}

/// Forwards debug records to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDebugLog;

impl DebugLog for TracingDebugLog {
    fn record(&self, source_key: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Debug => debug!(source = source_key, "{}", message),
            Severity::Info => info!(source = source_key, "{}", message),
            Severity::Warn => warn!(source = source_key, "{}", message),
            Severity::Error => error!(source = source_key, "{}", message),
        }
    }
}

/// A single retained debug record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugRecord {
    pub source_key: String,
    pub message: String,
    pub severity: Severity,
}

/// Keeps the most recent records in memory, e.g. for a source-debugging view
#[derive(Debug)]
pub struct MemoryDebugLog {
    capacity: usize,
    records: Mutex<VecDeque<DebugRecord>>,
}

impl MemoryDebugLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Snapshot of the retained records, oldest first
    pub fn records(&self) -> Vec<DebugRecord> {
        match self.records.lock() {
            Ok(records) => records.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Retained records for one source
    pub fn records_for(&self, source_key: &str) -> Vec<DebugRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.source_key == source_key)
            .collect()
    }
}

impl Default for MemoryDebugLog {
    fn default() -> Self {
        Self::new(512)
    }
}

impl DebugLog for MemoryDebugLog {
    fn record(&self, source_key: &str, message: &str, severity: Severity) {
        // A poisoned lock only means another recorder panicked; keep going.
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(DebugRecord {
            source_key: source_key.to_string(),
            message: message.to_string(),
            severity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_is_bounded() {
        let log = MemoryDebugLog::new(2);
        log.record("a", "one", Severity::Info);
        log.record("b", "two", Severity::Warn);
        log.record("a", "three", Severity::Error);

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "two");
        assert_eq!(records[1].message, "three");
        assert_eq!(log.records_for("a").len(), 1);
    }

    #[test]
    fn test_tracing_log_never_panics() {
        let log = TracingDebugLog;
        log.record("src", "hello", Severity::Debug);
        log.record("src", "hello", Severity::Error);
    }
}
