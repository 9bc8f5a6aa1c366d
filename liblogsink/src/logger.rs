/*
 * Logger facade
 *
 * AsyncLogger ties a Sink and its WriteBackWorker together and exposes the
 * operations callers use: open, submit, level get/set, and shutdown.
 *
 * Shutdown order matters: the worker is stopped and drained first, then the
 * sink is closed, so no queued entry ever meets a closed file.
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LogConfig;
use crate::entry::LogEntry;
use crate::error::Result;
use crate::severity::Severity;
use crate::sink::Sink;
use crate::writer::{StatsSnapshot, WorkerState, WriteBackWorker};

/// A file log sink with asynchronous write-back.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
///
/// ```no_run
/// use liblogsink::{AsyncLogger, Severity};
///
/// let logger = AsyncLogger::open("app.log", Severity::Info)?;
/// logger.submit("service started", Severity::Info);
/// logger.set_level(Severity::Debug);
/// logger.shutdown()?;
/// # Ok::<(), liblogsink::Error>(())
/// ```
pub struct AsyncLogger {
    sink: Arc<Sink>,
    worker: WriteBackWorker,
    shutdown_timeout: Option<Duration>,
}

impl AsyncLogger {
    /// Opens `path` for append and starts the writer. Fails if the file
    /// cannot be opened; nothing is started in that case.
    pub fn open(path: impl AsRef<Path>, level: Severity) -> Result<Self> {
        let sink = Sink::open(path, level)?;
        Self::with_sink(sink, None)
    }

    /// Opens the file named by `config` with its threshold and shutdown policy.
    pub fn from_config(config: &LogConfig) -> Result<Self> {
        let sink = Sink::open_with_options(
            config.resolved_path(),
            config.threshold,
            config.create_dirs,
        )?;
        Self::with_sink(sink, config.shutdown_timeout())
    }

    /// Starts a writer over an already opened sink.
    pub fn with_sink(sink: Sink, shutdown_timeout: Option<Duration>) -> Result<Self> {
        let sink = Arc::new(sink);
        let worker = WriteBackWorker::start(Arc::clone(&sink))?;

        tracing::info!(
            path = ?sink.path(),
            level = %sink.level(),
            "logger initialized"
        );

        Ok(AsyncLogger {
            sink,
            worker,
            shutdown_timeout,
        })
    }

    /// Queues a message. Filtering happens later, against the level in
    /// effect when the entry is written.
    ///
    /// Returns `false` if the logger has shut down and the entry was
    /// refused. `true` does not mean the entry will be written.
    pub fn submit(&self, message: impl Into<String>, severity: Severity) -> bool {
        match self.worker.submit(LogEntry::new(message, severity)) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "log entry refused");
                false
            }
        }
    }

    pub fn debug(&self, message: impl Into<String>) -> bool {
        self.submit(message, Severity::Debug)
    }

    pub fn info(&self, message: impl Into<String>) -> bool {
        self.submit(message, Severity::Info)
    }

    pub fn warning(&self, message: impl Into<String>) -> bool {
        self.submit(message, Severity::Warning)
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.submit(message, Severity::Error)
    }

    /// Changes the threshold immediately, bypassing the queue.
    pub fn set_level(&self, level: Severity) {
        self.sink.set_level(level);
    }

    pub fn level(&self) -> Severity {
        self.sink.level()
    }

    pub fn level_name(&self) -> &'static str {
        self.level().as_str()
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.path()
    }

    pub fn worker_state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.worker.stats()
    }

    /// Stops the writer, waits for it to drain, then closes the file.
    ///
    /// Safe to call more than once, from any thread, including one that is
    /// driving an async runtime. The sink is closed even when the drain
    /// fails, and the first error is returned.
    pub fn shutdown(&self) -> Result<()> {
        let drained = self.worker.shutdown(self.shutdown_timeout);
        let closed = self.sink.close();

        drained?;
        closed?;

        tracing::debug!(stats = ?self.worker.stats(), "logger shut down");
        Ok(())
    }
}

// Ensure queued entries reach the file when the logger goes away
impl Drop for AsyncLogger {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "logger shutdown failed during drop");
        }
    }
}
