/*
 * Asynchronous write-back
 *
 * This module implements the queue between producers and the sink:
 * - An unbounded FIFO channel that any thread can submit entries to
 * - A single background task that dequeues entries and writes them to the Sink
 * - A stop signal that moves the worker from Running to Draining to Stopped
 * - Counters that make dropped and failed entries observable
 *
 * The consumer runs on its own named thread, driving a current-thread Tokio
 * runtime. File I/O never stalls the caller's threads or runtime, and
 * shutdown waits on the thread itself, so it works from any context. There
 * is exactly one consumer, which is what keeps file lines in dequeue order.
 */

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tokio::runtime::Builder;
use tokio::sync::{mpsc, oneshot};

use crate::entry::LogEntry;
use crate::error::{Error, Result};
use crate::sink::{Sink, WriteOutcome, TIMESTAMP_FORMAT};

/// Lifecycle of the write-back worker. Transitions only go forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for entries or a stop request
    Running = 0,
    /// Stop observed; writing whatever is still queued
    Draining = 1,
    /// The worker has finished, or shutdown gave up on it
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Running,
            1 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

/// Counters kept by the worker
#[derive(Debug, Default)]
struct WriterStats {
    submitted: AtomicU64,
    written: AtomicU64,
    filtered: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of the worker's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Entries accepted into the queue
    pub submitted: u64,
    /// Entries appended to the output
    pub written: u64,
    /// Entries dropped by the level filter at write time
    pub filtered: u64,
    /// Entries lost to an output error
    pub failed: u64,
    /// Entries dequeued after the sink was already closed
    pub discarded: u64,
    /// Submissions refused because the worker had stopped
    pub rejected: u64,
}

impl WriterStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

// Shared between the handle and the consumer thread
struct Shared {
    state: AtomicU8,
    // Set when shutdown stops waiting; the drain ends after the current write
    abandoned: AtomicBool,
    stats: WriterStats,
}

impl Shared {
    // Never moves backwards, even when an abandoned worker catches up
    fn set_state(&self, state: WorkerState) {
        self.state.fetch_max(state as u8, Ordering::AcqRel);
    }
}

// Everything needed to stop the worker; taken exactly once by shutdown
struct Lifecycle {
    stop: oneshot::Sender<()>,
    done: std_mpsc::Receiver<()>,
    thread: thread::JoinHandle<()>,
}

/// The single consumer that moves queued entries into a [`Sink`].
pub struct WriteBackWorker {
    sender: mpsc::UnboundedSender<LogEntry>,
    lifecycle: Mutex<Option<Lifecycle>>,
    shared: Arc<Shared>,
}

impl WriteBackWorker {
    /// Starts the writer thread and its consumer task for `sink`.
    pub fn start(sink: Arc<Sink>) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel::<LogEntry>();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<io::Result<()>>(1);
        let (done_tx, done_rx) = std_mpsc::sync_channel::<()>(1);

        let shared = Arc::new(Shared {
            state: AtomicU8::new(WorkerState::Running as u8),
            abandoned: AtomicBool::new(false),
            stats: WriterStats::default(),
        });
        let worker_shared = Arc::clone(&shared);

        // The runtime is built and dropped on the writer thread, never on
        // the caller's, which may itself be inside a runtime.
        let thread = thread::Builder::new()
            .name("logsink-writer".into())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().build() {
                    Ok(runtime) => {
                        let _ = ready_tx.send(Ok(()));
                        runtime
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                runtime.block_on(process_entries(receiver, stop_rx, sink, worker_shared));
                let _ = done_tx.send(());
            })
            .map_err(Error::Runtime)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(Error::Runtime(e)),
            Err(_) => {
                return Err(Error::WorkerPanicked(
                    "writer thread exited during startup".into(),
                ))
            }
        }

        Ok(WriteBackWorker {
            sender,
            lifecycle: Mutex::new(Some(Lifecycle {
                stop: stop_tx,
                done: done_rx,
                thread,
            })),
            shared,
        })
    }

    /// Queues `entry` for writing. Never blocks on I/O.
    ///
    /// Returns [`Error::WriterStopped`] once the worker has begun draining;
    /// an `Ok` only means the entry was queued, not that it was written.
    pub fn submit(&self, entry: LogEntry) -> Result<()> {
        match self.sender.send(entry) {
            Ok(()) => {
                self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => {
                self.shared.stats.rejected.fetch_add(1, Ordering::Relaxed);
                Err(Error::WriterStopped)
            }
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Signals the worker to stop and waits until it has written every entry
    /// queued before the signal was observed.
    ///
    /// Blocks the calling thread, whether or not it belongs to an async
    /// runtime. With `timeout` set, gives up after that long and returns
    /// [`Error::ShutdownTimeout`]; the worker finishes its current write and
    /// discards the rest. Calling `shutdown` again after it has returned is
    /// a no-op.
    pub fn shutdown(&self, timeout: Option<Duration>) -> Result<()> {
        // Hold the lock for the whole shutdown so a concurrent caller returns
        // only after the worker has stopped.
        let mut lifecycle = lock(&self.lifecycle);
        let Some(Lifecycle { stop, done, thread }) = lifecycle.take() else {
            return Ok(());
        };

        // The worker may already be gone if it panicked
        let _ = stop.send(());

        let finished = match timeout {
            Some(limit) => done.recv_timeout(limit),
            None => done.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match finished {
            Ok(()) => thread
                .join()
                .map_err(|_| Error::WorkerPanicked("writer thread panicked on exit".into())),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("log writer did not drain in time, abandoning queued entries");
                self.shared.abandoned.store(true, Ordering::Release);
                self.shared.set_state(WorkerState::Stopped);
                // The thread is detached and exits after its current write
                Err(Error::ShutdownTimeout)
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.shared.set_state(WorkerState::Stopped);
                let reason = match thread.join() {
                    Err(payload) => panic_message(payload.as_ref()),
                    Ok(()) => "writer thread exited without finishing".to_string(),
                };
                Err(Error::WorkerPanicked(reason))
            }
        }
    }
}

// Ensure queued entries reach the sink when the worker goes away
impl Drop for WriteBackWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown(None) {
            tracing::error!(error = %e, "log writer shutdown failed during drop");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "writer thread panicked".to_string()
    }
}

// The consumer loop: Running until stop is observed, then Draining until
// the queue is empty, then Stopped.
async fn process_entries(
    mut receiver: mpsc::UnboundedReceiver<LogEntry>,
    mut stop: oneshot::Receiver<()>,
    sink: Arc<Sink>,
    shared: Arc<Shared>,
) {
    loop {
        tokio::select! {
            biased;

            // Fires on a stop request or if the worker handle was dropped
            _ = &mut stop => break,

            next = receiver.recv() => match next {
                Some(entry) => write_entry(&sink, &entry, &shared.stats),
                None => break,
            },
        }
    }

    shared.set_state(WorkerState::Draining);

    // Refuse new submissions, then write everything already queued
    receiver.close();
    let mut drained: u64 = 0;
    while let Some(entry) = receiver.recv().await {
        if shared.abandoned.load(Ordering::Acquire) {
            break;
        }
        write_entry(&sink, &entry, &shared.stats);
        drained += 1;
    }

    shared.set_state(WorkerState::Stopped);
    tracing::debug!(drained, "log writer stopped");
}

fn write_entry(sink: &Sink, entry: &LogEntry, stats: &WriterStats) {
    match sink.write(entry) {
        Ok(WriteOutcome::Written) => {
            stats.written.fetch_add(1, Ordering::Relaxed);
        }
        Ok(WriteOutcome::Filtered) => {
            stats.filtered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(WriteOutcome::Closed) => {
            stats.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                severity = %entry.severity(),
                submitted_at = %entry.submitted_at().format(TIMESTAMP_FORMAT),
                "log sink closed before entry was written"
            );
        }
        Err(e) => {
            // Reported here and only here; the log file itself may be the problem
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                error = %e,
                severity = %entry.severity(),
                submitted_at = %entry.submitted_at().format(TIMESTAMP_FORMAT),
                "failed to write log entry, dropping it"
            );
        }
    }
}
