//! Error types for the log sink

use std::io;
use std::path::PathBuf;

/// Result type for log sink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while opening, writing or stopping the sink
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing file could not be created or opened for append
    #[error("failed to open log file {path}: {source}")]
    Open {
        /// The path that failed to open
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// An individual line could not be written
    #[error("failed to write log line: {0}")]
    Write(#[source] io::Error),

    /// The write-back worker has stopped accepting entries
    #[error("log writer has stopped, entry rejected")]
    WriterStopped,

    /// The worker did not finish draining within the configured timeout
    #[error("log writer did not drain within the shutdown timeout")]
    ShutdownTimeout,

    /// The writer thread panicked or exited early
    #[error("log writer thread panicked: {0}")]
    WorkerPanicked(String),

    /// The writer thread or its runtime could not be started
    #[error("failed to start log writer: {0}")]
    Runtime(#[source] io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
