//! Submission log entries and sinks
//!
//! The pipeline reports progress as a stream of [`SubmissionLogEntry`]
//! values pushed into a caller-supplied [`LogSink`], in the order the
//! events happen.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Entry severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A phase is starting or an informational step
    Info,
    /// A phase completed
    Success,
    /// A phase failed
    Error,
}

/// One line of the running submission console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionLogEntry {
    /// When the entry was emitted
    pub timestamp: DateTime<Utc>,
    /// Human-readable message
    pub message: String,
    /// Entry severity
    pub severity: Severity,
}

impl SubmissionLogEntry {
    /// Creates an entry stamped with the current time
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        }
    }
}

/// Receiver for submission log entries
pub trait LogSink: Send + Sync {
    /// Accepts one entry
    fn emit(&self, entry: SubmissionLogEntry);
}

impl<F> LogSink for F
where
    F: Fn(SubmissionLogEntry) + Send + Sync,
{
    fn emit(&self, entry: SubmissionLogEntry) {
        self(entry)
    }
}

/// Captures entries in memory
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<SubmissionLogEntry>>,
}

impl MemoryLogSink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn entries(&self) -> Vec<SubmissionLogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages only, in order
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }
}

impl LogSink for MemoryLogSink {
    fn emit(&self, entry: SubmissionLogEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Forwards entries to `tracing` only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, entry: SubmissionLogEntry) {
        match entry.severity {
            Severity::Error => tracing::error!(target: "osm_submit::submission", "{}", entry.message),
            _ => tracing::info!(target: "osm_submit::submission", "{}", entry.message),
        }
    }
}

/// Prints a colored running console to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogSink;

impl ConsoleLogSink {
    /// Renders one console line
    pub fn render(entry: &SubmissionLogEntry) -> String {
        let time = entry.timestamp.format("%H:%M:%S");
        let marker = match entry.severity {
            Severity::Info => "•".blue(),
            Severity::Success => "✓".green(),
            Severity::Error => "✗".red(),
        };
        format!("[{}] {} {}", time, marker, entry.message)
    }
}

impl LogSink for ConsoleLogSink {
    fn emit(&self, entry: SubmissionLogEntry) {
        println!("{}", Self::render(&entry));
    }
}
