//! Tests for Store
//!
//! These tests verify:
//! - Basic get/set/delete operations
//! - Key validation
//! - Copy isolation
//! - Lifecycle (open/close, operations after close)
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use universekv::config::{Config, FlushPolicy};
use universekv::{Store, UniverseError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store(policy: FlushPolicy) -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .wal_path(temp_dir.path().join("store.wal"))
        .flush_policy(policy)
        .build();
    let store = Store::open(config).unwrap();
    (temp_dir, store)
}

fn batched() -> FlushPolicy {
    FlushPolicy::Batched {
        max_entries: 64,
        interval: Duration::from_millis(10),
    }
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_wal_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("store.wal");

    let store = Store::open_path(&path).unwrap();

    assert!(path.exists());
    assert_eq!(store.wal_path(), path.as_path());
    assert_eq!(store.config().flush_policy, FlushPolicy::Synchronous);
    assert!(store.is_empty());
}

#[test]
fn test_set_get() {
    let (_temp, store) = setup_temp_store(FlushPolicy::Synchronous);

    store.set("hello", b"world").unwrap();

    assert_eq!(store.get("hello").unwrap(), Some(b"world".to_vec()));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_get_nonexistent_key() {
    let (_temp, store) = setup_temp_store(FlushPolicy::Synchronous);
    assert_eq!(store.get("nonexistent").unwrap(), None);
}

#[test]
fn test_set_overwrites() {
    let (_temp, store) = setup_temp_store(batched());

    store.set("k", b"1").unwrap();
    store.set("k", b"2").unwrap();

    assert_eq!(store.get("k").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_delete_twice() {
    let (_temp, store) = setup_temp_store(FlushPolicy::Synchronous);
    store.set("k", b"v").unwrap();

    assert!(store.delete("k").unwrap());
    assert!(!store.delete("k").unwrap());
    assert!(!store.delete("never-existed").unwrap());
}

#[test]
fn test_user_scenario() {
    let (_temp, store) = setup_temp_store(FlushPolicy::Synchronous);
    let value = br#"{"name":"Ada"}"#;

    store.set("user:1", value).unwrap();
    assert_eq!(store.get("user:1").unwrap(), Some(value.to_vec()));

    assert!(store.delete("user:1").unwrap());
    assert_eq!(store.get("user:1").unwrap(), None);

    let path = store.wal_path().to_path_buf();
    store.close().unwrap();

    let reopened = Store::open_path(&path).unwrap();
    assert_eq!(reopened.get("user:1").unwrap(), None);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_empty_key_rejected() {
    let (_temp, store) = setup_temp_store(FlushPolicy::Synchronous);

    assert!(matches!(store.set("", b"v"), Err(UniverseError::InvalidKey)));
    assert!(matches!(store.delete(""), Err(UniverseError::InvalidKey)));

    // Nothing reached the WAL
    let path = store.wal_path().to_path_buf();
    store.close().unwrap();
    assert_eq!(universekv::wal::verify(&path).unwrap().frames(), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let config = Config::builder()
        .wal_path(temp_dir.path().join("store.wal"))
        .index_shards(3)
        .build();
    assert!(matches!(Store::open(config), Err(UniverseError::Config(_))));

    let config = Config::builder()
        .wal_path(temp_dir.path().join("store.wal"))
        .flush_policy(FlushPolicy::Batched {
            max_entries: 0,
            interval: Duration::from_millis(1),
        })
        .build();
    assert!(matches!(Store::open(config), Err(UniverseError::Config(_))));
}

// =============================================================================
// Copy Isolation Tests
// =============================================================================

#[test]
fn test_get_returns_copy() {
    let (_temp, store) = setup_temp_store(FlushPolicy::Synchronous);
    store.set("foo", b"bar").unwrap();

    let mut got = store.get("foo").unwrap().unwrap();
    got[0] = b'z';

    assert_eq!(store.get("foo").unwrap(), Some(b"bar".to_vec()));
}

#[test]
fn test_set_copies_caller_buffer() {
    let (_temp, store) = setup_temp_store(FlushPolicy::Synchronous);
    let mut buf = b"bar".to_vec();

    store.set("foo", &buf).unwrap();
    buf[0] = b'z';

    assert_eq!(store.get("foo").unwrap(), Some(b"bar".to_vec()));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_operations_after_close_fail() {
    let (_temp, store) = setup_temp_store(batched());
    store.set("k", b"v").unwrap();
    store.close().unwrap();

    assert!(store.is_closed());
    assert!(matches!(store.get("k"), Err(UniverseError::Closed)));
    assert!(matches!(store.set("k", b"v"), Err(UniverseError::Closed)));
    assert!(matches!(store.delete("k"), Err(UniverseError::Closed)));
    assert!(matches!(store.sync(), Err(UniverseError::Closed)));
    assert!(matches!(store.close(), Err(UniverseError::Closed)));
}

#[test]
fn test_invalid_key_checked_before_closed() {
    let (_temp, store) = setup_temp_store(batched());
    store.close().unwrap();

    assert!(matches!(store.set("", b"v"), Err(UniverseError::InvalidKey)));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_and_readers() {
    let (_temp, store) = setup_temp_store(batched());
    let store = Arc::new(store);

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..250 {
                    store.set(&format!("t{}-{}", t, i), b"v").unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..250 {
                    let _ = store.get(&format!("t0-{}", i)).unwrap();
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 1000);
    store.close().unwrap();
}
