//! Error types for UniverseKV
//!
//! Provides a unified error type for all engine operations.

use thiserror::Error;

/// Result type alias using UniverseError
pub type Result<T> = std::result::Result<T, UniverseError>;

/// Unified error type for UniverseKV operations
#[derive(Debug, Error)]
pub enum UniverseError {
    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("key must not be empty")]
    InvalidKey,

    #[error("store is closed")]
    Closed,

    #[error("entry payload of {size} bytes exceeds the {max} byte frame limit")]
    EntryTooLarge { size: u64, max: u64 },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    #[error("WAL corruption detected at offset {offset}: {reason}")]
    CorruptWal { offset: u64, reason: String },

    #[error("WAL flush failed, store no longer accepts writes: {0}")]
    FlushFailed(String),

    #[error("recovery failed: {0}")]
    RecoveryFailed(#[source] Box<UniverseError>),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UniverseError {
    /// True for the corruption family (`CorruptFrame`, `CorruptWal`),
    /// including when wrapped by `RecoveryFailed`.
    pub fn is_corruption(&self) -> bool {
        match self {
            UniverseError::CorruptFrame(_) | UniverseError::CorruptWal { .. } => true,
            UniverseError::RecoveryFailed(inner) => inner.is_corruption(),
            _ => false,
        }
    }
}
