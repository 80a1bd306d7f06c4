//! WAL Verification
//!
//! Read-only inspection of a log file that is not open in a Store. Unlike
//! `Wal::read_all`, which is strict and fails on the first corrupt frame, this
//! reports how far the log can be trusted so an operator can decide what to do
//! with the tail.

use std::fs::File;
use std::path::Path;

use super::entry::{EntryKind, LogEntry};
use super::frame::{self, Decoded};
use super::reader::FrameReader;
use crate::error::{Result, UniverseError};

/// Result of scanning a log file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Set frames before the first corruption
    pub sets: u64,

    /// Delete frames before the first corruption
    pub deletes: u64,

    /// Well-formed frames of a kind this build does not know
    pub unknown_kinds: u64,

    /// Length of the trusted prefix; equals `file_bytes` for a clean log
    pub valid_bytes: u64,

    /// Size of the file on disk
    pub file_bytes: u64,

    /// Why the scan stopped early, if it did
    pub corruption: Option<String>,
}

impl ScanReport {
    /// Number of intact frames, of any kind
    pub fn frames(&self) -> u64 {
        self.sets + self.deletes + self.unknown_kinds
    }

    /// No corruption and no trailing garbage
    pub fn is_clean(&self) -> bool {
        self.corruption.is_none()
    }
}

/// Scan `path` without modifying it
pub fn verify(path: &Path) -> Result<ScanReport> {
    scan(path, |_, _| {})
}

/// Scan `path`, handing every decodable entry and its offset to `visit`
pub fn scan<F>(path: &Path, mut visit: F) -> Result<ScanReport>
where
    F: FnMut(u64, &LogEntry),
{
    let file = File::open(path)?;
    let file_bytes = file.metadata()?.len();
    let mut report = ScanReport {
        file_bytes,
        ..ScanReport::default()
    };

    for item in FrameReader::new(file, file_bytes) {
        let (offset, frame) = match item {
            Ok(frame) => frame,
            Err(UniverseError::CorruptWal { reason, .. }) => {
                report.corruption = Some(reason);
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        match frame::decode_frame(&frame) {
            Ok(Decoded::Entry(entry)) => {
                match entry.kind() {
                    EntryKind::Set => report.sets += 1,
                    EntryKind::Delete => report.deletes += 1,
                }
                visit(offset, &entry);
            }
            Ok(Decoded::UnknownKind(_)) => report.unknown_kinds += 1,
            Err(UniverseError::CorruptFrame(reason)) => {
                report.corruption = Some(reason);
                return Ok(report);
            }
            Err(e) => return Err(e),
        }
        report.valid_bytes = offset + frame.encoded_len() as u64;
    }

    Ok(report)
}
