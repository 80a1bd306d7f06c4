//! Sharded index implementation
//!
//! HashMap shards with a parking_lot RwLock each.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use parking_lot::RwLock;

use super::DEFAULT_SHARDS;
use crate::wal::{EntryKind, LogEntry};

type Shard = RwLock<HashMap<String, Vec<u8>>>;

/// Concurrent key → value map
pub struct Index {
    shards: Box<[Shard]>,
    hasher: RandomState,

    /// `shards.len() - 1`; shard count is always a power of two
    mask: usize,
}

impl Index {
    /// Create an empty index with the default shard count
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create an empty index; `shards` is rounded up to a power of two
    pub fn with_shards(shards: usize) -> Self {
        let count = shards.max(1).next_power_of_two();
        let shards = (0..count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            hasher: RandomState::new(),
            mask: count - 1,
        }
    }

    fn shard(&self, key: &str) -> &Shard {
        let slot = self.hasher.hash_one(key) as usize & self.mask;
        &self.shards[slot]
    }

    /// Copy of the value stored under `key`
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.shard(key).read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Store a copy of `value` under `key`
    pub fn set(&self, key: &str, value: &[u8]) {
        self.shard(key).write().insert(key.to_owned(), value.to_vec());
    }

    /// Remove `key`; returns whether it was present
    pub fn delete(&self, key: &str) -> bool {
        self.shard(key).write().remove(key).is_some()
    }

    /// Apply one WAL entry. Returns whether the key existed before.
    pub fn apply(&self, entry: LogEntry) -> bool {
        let (kind, key, value) = entry.into_parts();
        match kind {
            EntryKind::Set => self.shard(&key).write().insert(key, value).is_some(),
            EntryKind::Delete => self.delete(&key),
        }
    }

    /// Number of keys (not atomic across shards)
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Copy of the whole map (not atomic across shards)
    pub fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        let mut out = HashMap::with_capacity(self.len());
        for shard in self.shards.iter() {
            out.extend(shard.read().iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        out
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}
