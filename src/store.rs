//! Store Module
//!
//! The public engine: one WAL plus one in-memory index.
//!
//! ## Responsibilities
//! - Replay the WAL into the index before serving anything
//! - Order mutations so WAL order and index order always agree
//! - Serve reads from the index without touching disk
//! - Drain buffered entries on close

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, UniverseError};
use crate::index::Index;
use crate::wal::{frame, LogEntry, Wal};

/// WAL-backed key/value store
///
/// ## Concurrency Model
///
/// - **Writes** (set/delete): serialized by `write_lock`. The WAL append and
///   the index update happen under the same guard, so the order entries reach
///   the log is the order they reach the index.
/// - **Reads** (get): no `write_lock`; the index is sharded and locks
///   internally.
/// - **Close**: takes `write_lock` too, so no mutation is half-applied when
///   the WAL drains.
///
/// Only one Store may own a given WAL path at a time. This is not enforced
/// with file locks; opening the same path twice concurrently is undefined.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Write-ahead log (source of truth)
    wal: Wal,

    /// Materialized view of the WAL
    index: Index,

    /// Serializes WAL-append + index-apply pairs
    write_lock: Mutex<()>,

    closed: AtomicBool,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Open/create the WAL and start its flush worker
    /// 3. Replay every frame into a fresh index
    /// 4. Ready to serve requests
    ///
    /// A replay failure closes the WAL and returns `RecoveryFailed`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let wal = Wal::with_config(&config)
            .map_err(|e| UniverseError::RecoveryFailed(Box::new(e)))?;

        let entries = match wal.read_all() {
            Ok(entries) => entries,
            Err(e) => {
                error!(path = %config.wal_path.display(), error = %e, "WAL replay failed");
                if let Err(close_err) = wal.close() {
                    warn!(error = %close_err, "closing WAL after failed replay");
                }
                return Err(UniverseError::RecoveryFailed(Box::new(e)));
            }
        };

        let index = Index::with_shards(config.index_shards);
        let replayed = entries.len();
        for entry in entries {
            index.apply(entry);
        }
        info!(
            path = %config.wal_path.display(),
            replayed,
            keys = index.len(),
            "store recovered"
        );

        Ok(Self {
            config,
            wal,
            index,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Open with a WAL path (convenience method)
    ///
    /// Uses the default config, i.e. synchronous flushing.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().wal_path(path.as_ref()).build();
        Self::open(config)
    }

    /// Get a copy of the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.index.get(key))
    }

    /// Store `value` under `key`
    ///
    /// Steps:
    /// 1. Reject an empty key or an entry too large for one frame
    /// 2. Acquire write lock
    /// 3. Append a Set entry to the WAL
    /// 4. Apply it to the index
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        frame::check_size(key.len(), value.len())?;
        let _write_guard = self.write_lock.lock();
        self.check_open()?;

        self.wal.append(LogEntry::set(key, value))?;
        self.index.set(key, value);
        Ok(())
    }

    /// Remove `key`; returns whether it existed
    ///
    /// A Delete entry is logged even when the key is absent.
    pub fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let _write_guard = self.write_lock.lock();
        self.check_open()?;

        self.wal.append(LogEntry::delete(key))?;
        Ok(self.index.delete(key))
    }

    /// Wait until every mutation issued so far is on stable storage
    pub fn sync(&self) -> Result<()> {
        self.check_open()?;
        self.wal.sync()
    }

    /// Close the store gracefully
    ///
    /// Drains buffered WAL entries, syncs and releases the file. Every later
    /// call, including a second close, fails with `Closed`.
    pub fn close(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(UniverseError::Closed);
        }
        self.wal.close()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the WAL path
    pub fn wal_path(&self) -> &Path {
        self.wal.path()
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(UniverseError::Closed);
        }
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(UniverseError::InvalidKey);
    }
    Ok(())
}
