//! # UniverseKV
//!
//! An embeddable key-value storage engine with:
//! - Write-Ahead Logging (WAL) with CRC32-checked frames
//! - Group commit through a background flush worker
//! - Strict replay-based crash recovery
//! - A sharded, concurrent in-memory index serving all reads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                               │
//! │              (write lock orders set/delete)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │    Index    │
//!   │  (Append)   │          │  (Sharded)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐   swap    ┌─────────────┐
//!   │   active    │ ───────▶  │   pending   │──▶ frame codec ──▶ log file
//!   │  (callers)  │           │  (worker)   │                   (fsync)
//!   └─────────────┘           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use universekv::Store;
//!
//! let store = Store::open_path("data/universe.wal")?;
//! store.set("user:1", br#"{"name":"Ada"}"#)?;
//! assert!(store.get("user:1")?.is_some());
//! store.close()?;
//! # Ok::<(), universekv::UniverseError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod index;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{UniverseError, Result};
pub use config::{Config, FlushPolicy};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of UniverseKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
