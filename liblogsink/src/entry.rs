use chrono::{DateTime, Local};

use crate::severity::Severity;

/// A single message submitted for possible persistence.
///
/// The line written to the file carries the time of the write, not
/// `submitted_at`; the submission time is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    message: String,
    severity: Severity,
    submitted_at: DateTime<Local>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            submitted_at: Local::now(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn submitted_at(&self) -> DateTime<Local> {
        self.submitted_at
    }
}
