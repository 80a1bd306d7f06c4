//! Index Module
//!
//! In-memory key → value map that serves every read.
//!
//! ## Responsibilities
//! - O(1) expected get/set/delete
//! - Many concurrent readers and writers without external locking
//! - Copy values in and out so callers never alias engine state
//!
//! ## Data Structure Choice
//! Lock striping: keys hash onto a fixed set of shards, each a
//! `HashMap` behind its own `RwLock`. Writers on different shards never
//! contend; readers of the same shard share the lock. The index is a
//! materialized view of the WAL and is rebuilt from it on every open.

mod sharded;

pub use sharded::Index;

/// Default number of shards
pub const DEFAULT_SHARDS: usize = 32;
