/*
 * Main library entry point that exposes the public API
 *
 * This file defines the public interface for the log sink, including:
 * - Re-exporting AsyncLogger, the facade most callers need
 * - Re-exporting the Sink, WriteBackWorker and LogOutput building blocks
 * - Re-exporting LogConfig and Severity for configuration
 * - Defining logging macros (log_debug, log_info, log_warning, log_error)
 *
 * The macros format their arguments and submit the result to the given
 * logger; they never block on file I/O.
 */

mod config;
mod entry;
mod error;
mod logger;
mod severity;
mod sink;
mod writer;

pub use config::LogConfig;
pub use entry::LogEntry;
pub use error::{Error, Result};
pub use logger::AsyncLogger;
pub use severity::{accepts, ParseSeverityError, Severity, SEVERITY_NAMES};
pub use sink::{format_line, FileOutput, LogOutput, Sink, WriteOutcome, TIMESTAMP_FORMAT};
pub use writer::{StatsSnapshot, WorkerState, WriteBackWorker};

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.submit(format!($($arg)+), $crate::Severity::Debug)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.submit(format!($($arg)+), $crate::Severity::Info)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $($arg:tt)+) => {
        $logger.submit(format!($($arg)+), $crate::Severity::Warning)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.submit(format!($($arg)+), $crate::Severity::Error)
    };
}
