//! Tests for the log file and frame reader
//!
//! These tests verify:
//! - Directory and file creation
//! - Append + scan in file order
//! - Structural corruption: truncated length, truncated payload, zero length
//! - Cursor repositioned at end-of-file after a scan

use std::fs;

use universekv::wal::{frame, FrameReader, LogEntry, LogFile};
use universekv::UniverseError;

use crate::common::{append_raw, frame_bytes, numbered_sets, setup_temp_wal};

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_parent_directories() {
    let (temp, _) = setup_temp_wal();
    let path = temp.path().join("a").join("b").join("store.wal");

    let log = LogFile::open(&path).unwrap();

    assert!(path.exists());
    assert!(log.is_empty());
    assert_eq!(log.path(), path.as_path());
}

#[cfg(unix)]
#[test]
fn test_open_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (temp, _) = setup_temp_wal();
    let dir = temp.path().join("fresh");
    let path = dir.join("store.wal");

    let _log = LogFile::open(&path).unwrap();

    // umask can only remove bits
    let dir_mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
    let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(dir_mode & !0o755, 0);
    assert_eq!(file_mode & !0o644, 0);
    assert_eq!(file_mode & 0o600, 0o600);
}

#[test]
fn test_open_existing_positions_at_end() {
    let (_temp, path) = setup_temp_wal();
    let first = frame_bytes(&LogEntry::set("a", b"1".to_vec()));
    append_raw(&path, &first);

    let mut log = LogFile::open(&path).unwrap();
    assert_eq!(log.len(), first.len() as u64);

    let second = frame_bytes(&LogEntry::set("b", b"2".to_vec()));
    log.append(&second).unwrap();
    log.persist().unwrap();

    let frames = log.scan_from_start().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].0, first.len() as u64);
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_empty_file() {
    let (_temp, path) = setup_temp_wal();
    let mut log = LogFile::open(&path).unwrap();

    assert!(log.scan_from_start().unwrap().is_empty());
}

#[test]
fn test_scan_returns_frames_in_order() {
    let (_temp, path) = setup_temp_wal();
    let mut log = LogFile::open(&path).unwrap();
    let entries = numbered_sets(20);

    for entry in &entries {
        log.append(&frame_bytes(entry)).unwrap();
    }
    log.persist().unwrap();

    let frames = log.scan_from_start().unwrap();
    assert_eq!(frames.len(), entries.len());
    for ((_, frame), entry) in frames.iter().zip(&entries) {
        assert_eq!(
            frame::decode_frame(frame).unwrap(),
            frame::Decoded::Entry(entry.clone())
        );
    }
}

#[test]
fn test_append_after_scan_continues_at_end() {
    let (_temp, path) = setup_temp_wal();
    let mut log = LogFile::open(&path).unwrap();

    log.append(&frame_bytes(&LogEntry::set("a", b"1".to_vec()))).unwrap();
    log.scan_from_start().unwrap();
    log.append(&frame_bytes(&LogEntry::set("b", b"2".to_vec()))).unwrap();
    log.persist().unwrap();

    assert_eq!(log.scan_from_start().unwrap().len(), 2);
    assert_eq!(fs::metadata(&path).unwrap().len(), log.len());
}

#[test]
fn test_scan_truncated_length_field() {
    let (_temp, path) = setup_temp_wal();
    let good = frame_bytes(&LogEntry::set("a", b"1".to_vec()));
    append_raw(&path, &good);
    append_raw(&path, &[0x00, 0x00]);

    let mut log = LogFile::open(&path).unwrap();
    let err = log.scan_from_start().unwrap_err();

    match err {
        UniverseError::CorruptWal { offset, .. } => assert_eq!(offset, good.len() as u64),
        other => panic!("expected CorruptWal, got {:?}", other),
    }
}

#[test]
fn test_scan_truncated_payload() {
    let (_temp, path) = setup_temp_wal();
    let good = frame_bytes(&LogEntry::set("a", b"1".to_vec()));
    let torn = frame_bytes(&LogEntry::set("b", b"a longer value".to_vec()));
    append_raw(&path, &good);
    append_raw(&path, &torn[..torn.len() - 3]);

    let mut log = LogFile::open(&path).unwrap();
    let err = log.scan_from_start().unwrap_err();

    assert!(matches!(err, UniverseError::CorruptWal { offset, .. } if offset == good.len() as u64));
}

#[test]
fn test_scan_zero_length_frame() {
    let (_temp, path) = setup_temp_wal();
    append_raw(&path, &[0u8; 12]);

    let mut log = LogFile::open(&path).unwrap();
    assert!(matches!(
        log.scan_from_start(),
        Err(UniverseError::CorruptWal { offset: 0, .. })
    ));
}

#[test]
fn test_scan_huge_declared_length() {
    let (_temp, path) = setup_temp_wal();
    let mut bytes = u32::MAX.to_be_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; 16]);
    append_raw(&path, &bytes);

    let mut log = LogFile::open(&path).unwrap();
    assert!(matches!(
        log.scan_from_start(),
        Err(UniverseError::CorruptWal { .. })
    ));
}

#[test]
fn test_truncate_discards_tail() {
    let (_temp, path) = setup_temp_wal();
    let mut log = LogFile::open(&path).unwrap();
    let good = frame_bytes(&LogEntry::set("a", b"1".to_vec()));

    log.append(&good).unwrap();
    log.append(&[0xFF; 5]).unwrap();
    log.truncate(good.len() as u64).unwrap();
    log.persist().unwrap();

    assert_eq!(log.len(), good.len() as u64);
    assert_eq!(log.scan_from_start().unwrap().len(), 1);
}

// =============================================================================
// FrameReader Tests
// =============================================================================

#[test]
fn test_reader_stops_after_first_error() {
    let good = frame_bytes(&LogEntry::set("a", b"1".to_vec()));
    let mut bytes = good.clone();
    bytes.extend_from_slice(&[0u8; 3]);
    bytes.extend_from_slice(&good);

    let len = bytes.len() as u64;
    let results: Vec<_> = FrameReader::new(bytes.as_slice(), len).collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn test_close_persists() {
    let (_temp, path) = setup_temp_wal();
    let mut log = LogFile::open(&path).unwrap();
    let bytes = frame_bytes(&LogEntry::set("a", b"1".to_vec()));

    log.append(&bytes).unwrap();
    log.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), bytes);
}
