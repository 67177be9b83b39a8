//! Activity log: the user-facing event stream the core writes to.

use dlc_common::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Severity of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "SUCCESS",
        };
        f.write_str(s)
    }
}

/// A single activity log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequence number, unique within one log.
    pub seq: u64,
    pub level: LogLevel,
    pub timestamp: Timestamp,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.timestamp.to_clock(), self.level, self.message)
    }
}

/// Destination for activity events. Implementations must accept concurrent writers.
pub trait LogSink: Send + Sync {
    fn record(&self, level: LogLevel, message: String);

    fn info(&self, message: String) {
        self.record(LogLevel::Info, message);
    }

    fn warning(&self, message: String) {
        self.record(LogLevel::Warning, message);
    }

    fn error(&self, message: String) {
        self.record(LogLevel::Error, message);
    }

    fn success(&self, message: String) {
        self.record(LogLevel::Success, message);
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn record(&self, _level: LogLevel, _message: String) {}
}

#[derive(Debug, Default)]
struct Inner {
    entries: VecDeque<LogEntry>,
    next_seq: u64,
}

/// Bounded in-memory log; the oldest entries are dropped once full.
#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ActivityLog {
    pub const DEFAULT_CAPACITY: usize = 500;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A writer that panicked cannot leave an entry half-inserted.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to JSONL format.
    pub fn to_jsonl(&self) -> String {
        self.entries()
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for ActivityLog {
    fn record(&self, level: LogLevel, message: String) {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(LogEntry {
            seq,
            level,
            timestamp: Timestamp::now(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let log = ActivityLog::with_capacity(2);
        log.info("one".to_string());
        log.warning("two".to_string());
        log.error("three".to_string());

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "two");
        assert_eq!(entries[0].seq, 1);
        assert_eq!(entries[1].level, LogLevel::Error);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let log = Arc::new(ActivityLog::with_capacity(10_000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.info(format!("thread {} event {}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 800);
        let mut seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
        seqs.dedup();
        assert_eq!(seqs.len(), 800);
    }

    #[test]
    fn test_jsonl_levels() {
        let log = ActivityLog::new();
        log.success("wiped".to_string());
        let jsonl = log.to_jsonl();
        assert!(jsonl.contains("\"level\":\"SUCCESS\""));
        assert!(log.entries()[0].to_string().contains("SUCCESS: wiped"));
    }
}
