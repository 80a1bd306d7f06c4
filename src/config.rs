//! Configuration for UniverseKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, UniverseError};

/// Main configuration for a Store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the write-ahead log file. Parent directories are created on open.
    /// The engine assumes exclusive ownership of this path.
    pub wal_path: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// When buffered entries are persisted and whether appends wait for it
    pub flush_policy: FlushPolicy,

    /// How many times a failed flush cycle is retried before the WAL is poisoned
    pub flush_retries: u32,

    /// Pause between flush retries
    pub retry_backoff: Duration,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Number of lock shards in the in-memory index (power of two)
    pub index_shards: usize,
}

/// WAL flush policy
///
/// Both variants drive the same group-commit pipeline; they only differ in
/// the size threshold, the timer interval and whether `append` waits for the
/// flush cycle that persists its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// flush + fsync before every append returns (safest, slowest)
    Synchronous,

    /// group commit: flush when `max_entries` are buffered or every `interval`,
    /// whichever comes first. A zero interval disables the timer.
    Batched { max_entries: usize, interval: Duration },
}

impl FlushPolicy {
    /// Default batch size of the batched policy
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    /// Default timer interval of the batched policy
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// Batched policy with the default threshold and interval
    pub fn batched() -> Self {
        FlushPolicy::Batched {
            max_entries: Self::DEFAULT_MAX_ENTRIES,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    /// Number of buffered entries that triggers an immediate flush
    pub fn threshold(&self) -> usize {
        match *self {
            FlushPolicy::Synchronous => 1,
            FlushPolicy::Batched { max_entries, .. } => max_entries.max(1),
        }
    }

    /// Periodic flush interval; zero means no timer
    pub fn interval(&self) -> Duration {
        match *self {
            FlushPolicy::Synchronous => Duration::ZERO,
            FlushPolicy::Batched { interval, .. } => interval,
        }
    }

    /// Whether `append` blocks until its entry is on stable storage
    pub fn waits_for_durability(&self) -> bool {
        matches!(self, FlushPolicy::Synchronous)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from("./universe.wal"),
            flush_policy: FlushPolicy::Synchronous,
            flush_retries: 3,
            retry_backoff: Duration::from_millis(10),
            index_shards: 32,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.wal_path.as_os_str().is_empty() {
            return Err(UniverseError::Config("wal_path must not be empty".into()));
        }
        if self.index_shards == 0 || !self.index_shards.is_power_of_two() {
            return Err(UniverseError::Config(format!(
                "index_shards must be a non-zero power of two, got {}",
                self.index_shards
            )));
        }
        if let FlushPolicy::Batched { max_entries: 0, .. } = self.flush_policy {
            return Err(UniverseError::Config("max_entries must be at least 1".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the WAL file path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = path.into();
        self
    }

    /// Set the flush policy
    pub fn flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.config.flush_policy = policy;
        self
    }

    /// Set the number of flush retries before the WAL is poisoned
    pub fn flush_retries(mut self, retries: u32) -> Self {
        self.config.flush_retries = retries;
        self
    }

    /// Set the pause between flush retries
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.config.retry_backoff = backoff;
        self
    }

    /// Set the number of index shards
    pub fn index_shards(mut self, shards: usize) -> Self {
        self.config.index_shards = shards;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
