/*
 * The leveled sink
 *
 * This module defines:
 * - LogOutput: the destination a sink writes formatted lines to
 * - FileOutput: an append-mode file destination that flushes every line
 * - Sink: the threshold and output handle guarded by one lock
 *
 * Every operation on a Sink, including the full format-and-append of a write,
 * runs under the same mutex, so writes never interleave and never observe a
 * half-updated threshold.
 */

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::entry::LogEntry;
use crate::error::{Error, Result};
use crate::severity::{accepts, Severity};

/// Local wall-clock time, second resolution
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A destination for formatted log lines.
///
/// `write_line` receives a line without its trailing newline. When it returns
/// `Ok`, the line must be visible to other readers of the destination.
pub trait LogOutput: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Append-only file destination. Each line is written with a single
/// `write_all` and flushed before returning.
pub struct FileOutput {
    file: File,
}

impl FileOutput {
    /// Opens `path` for append, creating the file if needed. Missing parent
    /// directories are created only when `create_dirs` is set.
    pub fn open(path: &Path, create_dirs: bool) -> Result<Self> {
        let open_error = |source: io::Error| Error::Open {
            path: path.to_path_buf(),
            source,
        };

        if create_dirs {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(open_error)?;
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_error)?;

        Ok(FileOutput { file })
    }
}

impl LogOutput for FileOutput {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        self.file.write_all(&bytes)?;
        self.file.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}

/// What happened to an entry handed to [`Sink::write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A line was appended
    Written,
    /// The entry was below the threshold in effect and was dropped
    Filtered,
    /// The sink was already closed; nothing was written
    Closed,
}

struct SinkState {
    threshold: Severity,
    output: Option<Box<dyn LogOutput>>,
}

/// Owns the output handle and the active threshold.
///
/// A `Sink` only exists once its output is open, so there is no way to call
/// `write` or `set_level` on an uninitialized sink. After [`Sink::close`],
/// writes become silent no-ops.
pub struct Sink {
    state: Mutex<SinkState>,
    path: Option<PathBuf>,
}

impl Sink {
    /// Opens (or creates) the file at `path` for append.
    pub fn open(path: impl AsRef<Path>, threshold: Severity) -> Result<Self> {
        Self::open_with_options(path, threshold, false)
    }

    /// Like [`Sink::open`], optionally creating missing parent directories.
    pub fn open_with_options(
        path: impl AsRef<Path>,
        threshold: Severity,
        create_dirs: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let output = FileOutput::open(path, create_dirs)?;

        tracing::debug!(path = %path.display(), %threshold, "log sink opened");

        Ok(Sink {
            state: Mutex::new(SinkState {
                threshold,
                output: Some(Box::new(output)),
            }),
            path: Some(path.to_path_buf()),
        })
    }

    /// Builds a sink over an arbitrary output.
    pub fn with_output(output: Box<dyn LogOutput>, threshold: Severity) -> Self {
        Sink {
            state: Mutex::new(SinkState {
                threshold,
                output: Some(output),
            }),
            path: None,
        }
    }

    // A poisoned lock only means a writer panicked mid-call; the threshold
    // and handle are still valid, so keep going.
    fn lock(&self) -> MutexGuard<'_, SinkState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("log sink mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Replaces the threshold. Applies to every write that starts afterwards,
    /// including entries already queued.
    pub fn set_level(&self, threshold: Severity) {
        self.lock().threshold = threshold;
    }

    pub fn level(&self) -> Severity {
        self.lock().threshold
    }

    /// Filters `entry` against the current threshold and appends it as one
    /// line if it passes.
    pub fn write(&self, entry: &LogEntry) -> Result<WriteOutcome> {
        let mut state = self.lock();
        let threshold = state.threshold;

        let Some(output) = state.output.as_mut() else {
            return Ok(WriteOutcome::Closed);
        };

        if !accepts(entry.severity(), threshold) {
            return Ok(WriteOutcome::Filtered);
        }

        let line = format_line(Local::now(), entry);
        output.write_line(&line).map_err(Error::Write)?;

        Ok(WriteOutcome::Written)
    }

    /// Closes the output. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock();
        match state.output.take() {
            Some(mut output) => {
                tracing::debug!("closing log sink");
                output.close().map_err(Error::Write)
            }
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().output.is_none()
    }

    /// Path of the backing file, if the sink was opened from one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Formats `entry` as `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`.
pub fn format_line(at: DateTime<Local>, entry: &LogEntry) -> String {
    format!(
        "[{}] [{}] {}",
        at.format(TIMESTAMP_FORMAT),
        entry.severity(),
        entry.message()
    )
}
