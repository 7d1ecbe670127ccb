//! Audit logging
//!
//! Statements, events and transaction steps are recorded as JSON lines in
//! one file per category. Recording never fails the caller: sink errors are
//! reported through `tracing` and dropped.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

/// Audit log category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    General,
    Event,
    Query,
    Transaction,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::General => "general",
            LogCategory::Event => "event",
            LogCategory::Query => "query",
            LogCategory::Transaction => "transaction",
        }
    }

    /// Log file name for this category
    pub fn file_name(&self) -> String {
        format!("{}_log.json", self.as_str())
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audit log line
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub category: LogCategory,
    pub message: String,
}

impl AuditEntry {
    pub fn new(category: LogCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            category,
            message: message.into(),
        }
    }
}

/// Destination for audit records
pub trait AuditSink {
    /// Record a message. Must not fail the caller.
    fn record(&self, category: LogCategory, message: &str);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&self, _category: LogCategory, _message: &str) {}
}

/// Appends JSON lines to `<dir>/<category>_log.json`
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, entry: &AuditEntry) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(entry.category.file_name()))?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)
    }
}

impl AuditSink for JsonFileSink {
    fn record(&self, category: LogCategory, message: &str) {
        let entry = AuditEntry::new(category, message);
        if let Err(e) = self.write(&entry) {
            warn!(category = %category, error = %e, "failed to write audit log");
        }
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Messages recorded under one category
    pub fn messages(&self, category: LogCategory) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.category == category)
            .map(|e| e.message)
            .collect()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, category: LogCategory, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(AuditEntry::new(category, message));
        }
    }
}

impl<T: AuditSink + ?Sized> AuditSink for std::sync::Arc<T> {
    fn record(&self, category: LogCategory, message: &str) {
        (**self).record(category, message)
    }
}
