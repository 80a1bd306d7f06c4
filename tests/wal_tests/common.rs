//! Helpers shared by the WAL tests

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use universekv::wal::{frame, LogEntry};

pub fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

/// On-disk bytes of one entry
pub fn frame_bytes(entry: &LogEntry) -> Vec<u8> {
    frame::encode(entry).unwrap().to_bytes()
}

/// Frame bytes whose payload carries an arbitrary kind byte
pub fn frame_with_kind(kind: u8, key: &str, value: &[u8]) -> Vec<u8> {
    let payload = bincode::serialize(&(kind, key.to_string(), value.to_vec())).unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
    bytes.extend_from_slice(&payload);
    bytes
}

/// Append raw bytes to a file, creating it if needed
pub fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

/// `count` distinct Set entries
pub fn numbered_sets(count: usize) -> Vec<LogEntry> {
    (0..count)
        .map(|i| LogEntry::set(format!("key{}", i), format!("value{}", i).into_bytes()))
        .collect()
}
