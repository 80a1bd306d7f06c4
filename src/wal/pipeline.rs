//! Flush Pipeline
//!
//! Group commit for the WAL. Callers push entries into an "active" buffer;
//! one background worker swaps it with its own "pending" buffer under a short
//! lock, then encodes, writes and fsyncs the batch without holding that lock.
//!
//! The worker wakes on whichever comes first:
//! - the timer (bounds how long an entry can stay buffered)
//! - a threshold signal from `submit` (bounds how many entries can be buffered)
//! - shutdown (one final cycle drains whatever is left)
//!
//! Threshold signals go through a channel of capacity one and are sent with
//! `try_send`, so a burst of threshold crossings schedules a single cycle.
//!
//! Every submitted entry gets a sequence number. After a cycle persists a
//! batch the worker publishes `durable_seq` and wakes everyone waiting on it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use super::entry::LogEntry;
use super::file::LogFile;
use super::frame;
use crate::config::FlushPolicy;
use crate::error::{Result, UniverseError};

/// Log file handle shared by the WAL façade and the flush worker.
/// `None` once the WAL is closed.
pub(crate) type SharedLog = Arc<Mutex<Option<LogFile>>>;

/// Caller-facing side of the buffer pair plus durability bookkeeping
struct BufferState {
    /// Entries not yet taken by a flush cycle
    active: Vec<LogEntry>,

    /// Sequence number handed to the next submitted entry
    next_seq: u64,

    /// Every entry with a lower sequence number has been through a completed
    /// flush cycle
    durable_seq: u64,

    /// Flush cycles that persisted a non-empty batch
    flush_cycles: u64,

    /// Set once a flush cycle fails for good; the pipeline is poisoned
    failure: Option<String>,

    /// No more submissions accepted
    closed: bool,

    /// The worker has returned; nothing will become durable anymore
    worker_exited: bool,
}

impl BufferState {
    fn check_writable(&self) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(UniverseError::FlushFailed(reason.clone()));
        }
        if self.closed {
            return Err(UniverseError::Closed);
        }
        Ok(())
    }
}

struct Shared {
    state: Mutex<BufferState>,
    durable: Condvar,
    log: SharedLog,
    threshold: usize,
    retries: u32,
    backoff: Duration,
}

/// Batches WAL entries and persists them from a background worker
pub struct FlushPipeline {
    shared: Arc<Shared>,
    wake_tx: Sender<()>,
    shutdown_tx: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
    waits_for_durability: bool,
}

impl FlushPipeline {
    /// Spawn the flush worker for `log`
    pub(crate) fn start(
        log: SharedLog,
        policy: FlushPolicy,
        retries: u32,
        backoff: Duration,
    ) -> Result<Self> {
        let threshold = policy.threshold();
        let shared = Arc::new(Shared {
            state: Mutex::new(BufferState {
                active: Vec::with_capacity(threshold),
                next_seq: 0,
                durable_seq: 0,
                flush_cycles: 0,
                failure: None,
                closed: false,
                worker_exited: false,
            }),
            durable: Condvar::new(),
            log,
            threshold,
            retries,
            backoff,
        });

        let (wake_tx, wake_rx) = channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let interval = policy.interval();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("universekv-wal-flush".into())
            .spawn(move || worker_shared.run(wake_rx, shutdown_rx, interval))?;

        Ok(Self {
            shared,
            wake_tx,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
            waits_for_durability: policy.waits_for_durability(),
        })
    }

    /// Queue an entry; returns its sequence number.
    ///
    /// Under the synchronous policy this also waits for the flush cycle that
    /// persists the entry.
    pub fn submit(&self, entry: LogEntry) -> Result<u64> {
        let (seq, full) = {
            let mut state = self.shared.state.lock();
            state.check_writable()?;
            let seq = state.next_seq;
            state.next_seq += 1;
            state.active.push(entry);
            (seq, state.active.len() >= self.shared.threshold)
        };

        if full {
            self.wake();
        }
        if self.waits_for_durability {
            self.wait_until(seq + 1)?;
        }
        Ok(seq)
    }

    /// Run a flush cycle covering everything submitted so far and wait for it
    pub fn sync(&self) -> Result<()> {
        let target = {
            let state = self.shared.state.lock();
            state.check_writable()?;
            if state.durable_seq >= state.next_seq {
                return Ok(());
            }
            state.next_seq
        };
        self.wake();
        self.wait_until(target)
    }

    /// Stop the worker after its final drain cycle.
    ///
    /// Fails with `Closed` if already closed, or with `FlushFailed` if the
    /// pipeline was poisoned (the worker is still stopped in that case).
    pub fn close(&self) -> Result<()> {
        let handle = self.worker.lock().take().ok_or(UniverseError::Closed)?;

        self.shared.state.lock().closed = true;
        let _ = self.shutdown_tx.send(());
        if handle.join().is_err() {
            error!("WAL flush worker panicked");
            return Err(UniverseError::FlushFailed("flush worker panicked".into()));
        }

        match &self.shared.state.lock().failure {
            Some(reason) => Err(UniverseError::FlushFailed(reason.clone())),
            None => Ok(()),
        }
    }

    /// Whether the worker is still running
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Entries waiting in the active buffer
    pub fn buffered(&self) -> usize {
        self.shared.state.lock().active.len()
    }

    /// Number of entries that have been through a completed flush cycle
    pub fn durable_seq(&self) -> u64 {
        self.shared.state.lock().durable_seq
    }

    /// Number of flush cycles that persisted a batch
    pub fn flush_cycles(&self) -> u64 {
        self.shared.state.lock().flush_cycles
    }

    fn wake(&self) {
        // Full means a cycle is already scheduled
        let _ = self.wake_tx.try_send(());
    }

    fn wait_until(&self, target: u64) -> Result<()> {
        let mut state = self.shared.state.lock();
        loop {
            if state.durable_seq >= target {
                return Ok(());
            }
            if let Some(reason) = &state.failure {
                return Err(UniverseError::FlushFailed(reason.clone()));
            }
            if state.worker_exited {
                return Err(UniverseError::Closed);
            }
            self.shared.durable.wait(&mut state);
        }
    }
}

impl Drop for FlushPipeline {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.close();
        }
    }
}

impl Shared {
    fn run(&self, wake_rx: Receiver<()>, shutdown_rx: Receiver<()>, interval: Duration) {
        let ticker = if interval.is_zero() {
            channel::never::<Instant>()
        } else {
            channel::tick(interval)
        };
        let mut pending = Vec::with_capacity(self.threshold);

        loop {
            select! {
                recv(ticker) -> _ => self.flush_cycle(&mut pending, "timer"),
                recv(wake_rx) -> msg => {
                    self.flush_cycle(&mut pending, "signal");
                    if msg.is_err() {
                        break;
                    }
                }
                recv(shutdown_rx) -> _ => {
                    self.flush_cycle(&mut pending, "shutdown");
                    break;
                }
            }
        }

        self.state.lock().worker_exited = true;
        self.durable.notify_all();
    }

    fn flush_cycle(&self, pending: &mut Vec<LogEntry>, reason: &'static str) {
        let batch_end = {
            let mut state = self.state.lock();
            if state.failure.is_some() {
                return;
            }
            std::mem::swap(&mut state.active, pending);
            state.next_seq
        };
        if pending.is_empty() {
            return;
        }

        let mut buf = BytesMut::new();
        let mut dropped = 0usize;
        for entry in pending.iter() {
            match frame::encode(entry) {
                Ok(frame) => frame.write_to(&mut buf),
                Err(e) => {
                    warn!(key = entry.key(), error = %e, "dropping unencodable WAL entry");
                    dropped += 1;
                }
            }
        }

        let entries = pending.len();
        let result = self.write_batch(&buf);
        pending.clear();

        let mut state = self.state.lock();
        match result {
            Ok(()) => {
                state.durable_seq = batch_end;
                state.flush_cycles += 1;
                debug!(reason, entries, dropped, bytes = buf.len(), "WAL flush cycle complete");
            }
            Err(e) => {
                error!(reason, entries, error = %e, "WAL flush failed permanently, rejecting further writes");
                state.failure = Some(e.to_string());
                state.active.clear();
            }
        }
        drop(state);
        self.durable.notify_all();
    }

    /// Append and fsync one batch, retrying from the last durable offset.
    ///
    /// Whatever the outcome, the file never ends in a partially written batch
    /// unless truncating it back fails too.
    fn write_batch(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.log.lock();
        let log = guard.as_mut().ok_or(UniverseError::Closed)?;
        if bytes.is_empty() {
            return Ok(());
        }

        let base = log.len();
        let mut attempt = 0u32;
        loop {
            let err = match log.append(bytes).and_then(|()| log.persist()) {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if let Err(truncate_err) = log.truncate(base) {
                error!(
                    offset = base,
                    error = %truncate_err,
                    "could not cut WAL back to its last durable offset"
                );
                return Err(err);
            }
            if attempt >= self.retries {
                return Err(err);
            }

            attempt += 1;
            warn!(attempt, max = self.retries, error = %err, "WAL flush failed, retrying");
            thread::sleep(self.backoff);
        }
    }
}
