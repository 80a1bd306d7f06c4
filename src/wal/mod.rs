//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append log entries before any mutation reaches the index
//! - Group commit through a background flush worker
//! - CRC32 checksums for corruption detection
//! - Replay of the whole log on startup
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Frame 1                                 │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ Payload (Len)   │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Frame 2                                 │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ Payload (Len)   │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! Both header fields are big-endian; the CRC covers the payload only.

mod entry;
mod file;
pub mod frame;
mod pipeline;
mod reader;
mod recovery;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

pub use entry::{EntryKind, LogEntry};
pub use file::LogFile;
pub use frame::{Decoded, Frame, HEADER_SIZE};
pub use reader::FrameReader;
pub use recovery::{scan, verify, ScanReport};

use crate::config::{Config, FlushPolicy};
use crate::error::{Result, UniverseError};
use pipeline::{FlushPipeline, SharedLog};

/// Durable append/replay API over one log file
pub struct Wal {
    path: PathBuf,
    log: SharedLog,
    pipeline: FlushPipeline,
}

impl Wal {
    /// Open or create the log at `path` with default retry settings
    pub fn open(path: &Path, policy: FlushPolicy) -> Result<Self> {
        let config = Config::builder().wal_path(path).flush_policy(policy).build();
        Self::with_config(&config)
    }

    /// Open or create the log described by `config` and start its flush worker
    pub fn with_config(config: &Config) -> Result<Self> {
        let file = LogFile::open(&config.wal_path)?;
        info!(
            path = %config.wal_path.display(),
            bytes = file.len(),
            policy = ?config.flush_policy,
            "WAL opened"
        );

        let log: SharedLog = Arc::new(Mutex::new(Some(file)));
        let pipeline = FlushPipeline::start(
            Arc::clone(&log),
            config.flush_policy,
            config.flush_retries,
            config.retry_backoff,
        )?;

        Ok(Self {
            path: config.wal_path.clone(),
            log,
            pipeline,
        })
    }

    /// Queue an entry for persistence.
    ///
    /// Returns once queued, or once durable under `FlushPolicy::Synchronous`.
    /// An entry too large for one frame is rejected with `EntryTooLarge`
    /// before it is queued.
    pub fn append(&self, entry: LogEntry) -> Result<()> {
        frame::check_size(entry.key().len(), entry.value().len())?;
        self.pipeline.submit(entry).map(|_| ())
    }

    /// Durability barrier for everything appended so far
    pub fn sync(&self) -> Result<()> {
        self.pipeline.sync()
    }

    /// Flush, then decode every frame in file order.
    ///
    /// Frames of unknown kind are skipped. The first corrupt frame fails the
    /// whole read with `CorruptWal`; nothing after it is returned.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        self.pipeline.sync()?;

        let frames = {
            let mut guard = self.log.lock();
            let log = guard.as_mut().ok_or(UniverseError::Closed)?;
            log.scan_from_start()?
        };

        let mut entries = Vec::with_capacity(frames.len());
        for (offset, frame) in frames {
            match frame::decode_frame(&frame) {
                Ok(Decoded::Entry(entry)) => entries.push(entry),
                Ok(Decoded::UnknownKind(kind)) => {
                    warn!(offset, kind, "skipping WAL frame of unknown kind");
                }
                Err(UniverseError::CorruptFrame(reason)) => {
                    return Err(UniverseError::CorruptWal { offset, reason });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }

    /// Drain buffered entries, stop the flush worker and close the file
    pub fn close(&self) -> Result<()> {
        let drained = self.pipeline.close();
        let closed = match self.log.lock().take() {
            Some(file) => file.close(),
            None => Ok(()),
        };
        drained.and(closed)?;
        info!(path = %self.path.display(), "WAL closed");
        Ok(())
    }

    /// Entries accepted but not yet taken by a flush cycle
    pub fn buffered(&self) -> usize {
        self.pipeline.buffered()
    }

    /// Number of entries that have been through a completed flush cycle
    /// since this WAL was opened
    pub fn durable_count(&self) -> u64 {
        self.pipeline.durable_seq()
    }

    /// Flush cycles that persisted a batch since this WAL was opened
    pub fn flush_cycles(&self) -> u64 {
        self.pipeline.flush_cycles()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if self.pipeline.is_running() {
            let _ = self.close();
        }
    }
}
