//! Tier stores
//!
//! Three capacity-bounded key/value stores back the cache:
//! - memory: in-process, hottest, smallest
//! - disk: process-local scratch files, intermediate capacity
//! - remote: shared key/value server, effectively the largest

pub mod disk;
pub mod memory;
pub mod remote;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use remote::{RemoteStore, StoreMetrics};

use crate::core::entry::CacheEntry;
use crate::core::error::Result;
use async_trait::async_trait;

/// Contract every tier store fulfils. `set` must fail with
/// `CacheError::InsufficientCapacity` rather than exceed its capacity, and
/// `get` signals a miss with `CacheError::KeyNotFound`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up an entry by key
    async fn get(&self, key: &str) -> Result<CacheEntry>;

    /// Insert or replace an entry, charging its size against capacity
    async fn set(&self, entry: CacheEntry) -> Result<()>;

    /// Remove an entry; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Capacity in bytes; -1 when the backing store cannot report one
    async fn capacity(&self) -> i64;

    /// Current usage in bytes
    async fn usage(&self) -> i64;

    /// All resident keys
    async fn keys(&self) -> Vec<String>;

    /// Snapshot of all resident entries
    async fn get_all(&self) -> Vec<CacheEntry>;
}

/// The three tiers, hottest first. Eviction names its source tier so the
/// demotion target is never inferred from entry sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierLevel {
    Fast,
    Local,
    Remote,
}

impl TierLevel {
    /// The next colder tier, if any
    pub fn next(self) -> Option<TierLevel> {
        match self {
            TierLevel::Fast => Some(TierLevel::Local),
            TierLevel::Local => Some(TierLevel::Remote),
            TierLevel::Remote => None,
        }
    }

    /// Label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            TierLevel::Fast => "fast",
            TierLevel::Local => "local",
            TierLevel::Remote => "remote",
        }
    }
}

impl std::fmt::Display for TierLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert_eq!(TierLevel::Fast.next(), Some(TierLevel::Local));
        assert_eq!(TierLevel::Local.next(), Some(TierLevel::Remote));
        assert_eq!(TierLevel::Remote.next(), None);
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(TierLevel::Fast.to_string(), "fast");
        assert_eq!(TierLevel::Local.to_string(), "local");
        assert_eq!(TierLevel::Remote.to_string(), "remote");
    }
}
