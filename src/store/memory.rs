use super::Store;
use crate::core::entry::CacheEntry;
use crate::core::error::{CacheError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

struct MemoryInner {
    entries: HashMap<String, CacheEntry>,
    usage: u64,
}

/// Fast tier: an in-memory map with strict byte accounting. Usage lives
/// under the same lock as the map so the two are never observed out of sync.
pub struct MemoryStore {
    capacity: u64,
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            inner: RwLock::new(MemoryInner {
                entries: HashMap::new(),
                usage: 0,
            }),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<CacheEntry> {
        let inner = self.inner.read();
        inner
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let mut inner = self.inner.write();

        // Replacing an existing key only charges the size delta
        let mut new_usage = inner.usage + entry.size;
        if let Some(existing) = inner.entries.get(&entry.key) {
            new_usage -= existing.size;
        }

        if new_usage > self.capacity {
            return Err(CacheError::InsufficientCapacity);
        }

        inner.entries.insert(entry.key.clone(), entry);
        inner.usage = new_usage;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.remove(key) {
            inner.usage -= entry.size;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.usage = 0;
        Ok(())
    }

    async fn capacity(&self) -> i64 {
        self.capacity as i64
    }

    async fn usage(&self) -> i64 {
        self.inner.read().usage as i64
    }

    async fn keys(&self) -> Vec<String> {
        self.inner.read().entries.keys().cloned().collect()
    }

    async fn get_all(&self) -> Vec<CacheEntry> {
        self.inner.read().entries.values().cloned().collect()
    }
}
