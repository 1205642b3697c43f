use super::Store;
use crate::core::entry::CacheEntry;
use crate::core::error::{CacheError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::debug;

struct DiskIndex {
    /// key -> charged size; deletes credit exactly what the write charged
    sizes: HashMap<String, u64>,
    usage: u64,
}

/// Local tier: one bincode-encoded file per key inside a scratch directory.
/// The directory is created at construction and removed when the store is
/// dropped; files are not meant to survive the process. Callers guarantee
/// keys are filesystem-safe strings of bounded length.
pub struct DiskStore {
    dir: TempDir,
    capacity: u64,
    index: RwLock<DiskIndex>,
}

impl DiskStore {
    pub fn new(capacity: u64) -> Result<Self> {
        let dir = TempDir::with_prefix("diskcache-")?;
        debug!("Disk store scratch directory at {:?}", dir.path());

        Ok(Self {
            dir,
            capacity,
            index: RwLock::new(DiskIndex {
                sizes: HashMap::new(),
                usage: 0,
            }),
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.path().join(key)
    }

    fn read_entry(path: &PathBuf) -> Result<CacheEntry> {
        let file = File::open(path)?;
        let entry = bincode::deserialize_from(BufReader::new(file))?;
        Ok(entry)
    }
}

#[async_trait]
impl Store for DiskStore {
    async fn get(&self, key: &str) -> Result<CacheEntry> {
        let _guard = self.index.read();
        let path = self.entry_path(key);
        if !path.is_file() {
            return Err(CacheError::KeyNotFound(key.to_string()));
        }
        Self::read_entry(&path)
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let mut index = self.index.write();

        let mut new_usage = index.usage + entry.size;
        if let Some(existing) = index.sizes.get(&entry.key) {
            new_usage -= existing;
        }
        if new_usage > self.capacity {
            return Err(CacheError::InsufficientCapacity);
        }

        let file = File::create(self.entry_path(&entry.key))?;
        bincode::serialize_into(file, &entry)?;

        index.sizes.insert(entry.key, entry.size);
        index.usage = new_usage;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut index = self.index.write();
        if let Some(size) = index.sizes.remove(key) {
            index.usage -= size;
        }
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut index = self.index.write();
        fs::remove_dir_all(self.dir.path())?;
        fs::create_dir_all(self.dir.path())?;
        index.sizes.clear();
        index.usage = 0;
        Ok(())
    }

    async fn capacity(&self) -> i64 {
        self.capacity as i64
    }

    async fn usage(&self) -> i64 {
        self.index.read().usage as i64
    }

    async fn keys(&self) -> Vec<String> {
        let _guard = self.index.read();
        let mut keys = Vec::new();
        if let Ok(dir) = fs::read_dir(self.dir.path()) {
            for file in dir.flatten() {
                keys.push(file.file_name().to_string_lossy().into_owned());
            }
        }
        keys
    }

    async fn get_all(&self) -> Vec<CacheEntry> {
        let _guard = self.index.read();
        let mut entries = Vec::new();
        if let Ok(dir) = fs::read_dir(self.dir.path()) {
            for file in dir.flatten() {
                // Unreadable or truncated files are skipped, not fatal
                if let Ok(entry) = Self::read_entry(&file.path()) {
                    entries.push(entry);
                }
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = DiskStore::new(1000).unwrap();

        let entry = CacheEntry::new("key1", b"value1".to_vec());
        store.set(entry.clone()).await.unwrap();

        let read = store.get("key1").await.unwrap();
        assert_eq!(read, entry);
        assert_eq!(store.usage().await, 6);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = DiskStore::new(1000).unwrap();
        let err = store.get("absent").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_over_capacity() {
        let store = DiskStore::new(10).unwrap();

        store
            .set(CacheEntry::new("k1", vec![0u8; 6]))
            .await
            .unwrap();

        let err = store
            .set(CacheEntry::new("k2", vec![0u8; 6]))
            .await
            .unwrap_err();
        assert!(err.is_insufficient_capacity());

        // The rejected entry left no file behind
        assert_eq!(store.keys().await, vec!["k1".to_string()]);
        assert_eq!(store.usage().await, 6);
    }

    #[tokio::test]
    async fn test_replace_adjusts_usage_by_delta() {
        let store = DiskStore::new(10).unwrap();

        store
            .set(CacheEntry::new("k", vec![0u8; 8]))
            .await
            .unwrap();
        store
            .set(CacheEntry::new("k", vec![0u8; 6]))
            .await
            .unwrap();

        assert_eq!(store.usage().await, 6);
        assert_eq!(store.get("k").await.unwrap().size, 6);
    }

    #[tokio::test]
    async fn test_delete_credits_charged_size() {
        let store = DiskStore::new(100).unwrap();

        store
            .set(CacheEntry::new("k1", vec![0u8; 7]))
            .await
            .unwrap();
        store.delete("k1").await.unwrap();

        assert_eq!(store.usage().await, 0);
        assert!(store.get("k1").await.unwrap_err().is_not_found());

        // Idempotent
        store.delete("k1").await.unwrap();
        assert_eq!(store.usage().await, 0);
    }

    #[tokio::test]
    async fn test_clear_recreates_directory() {
        let store = DiskStore::new(100).unwrap();

        store
            .set(CacheEntry::new("k1", vec![0u8; 4]))
            .await
            .unwrap();
        store
            .set(CacheEntry::new("k2", vec![0u8; 4]))
            .await
            .unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.usage().await, 0);
        assert!(store.keys().await.is_empty());

        // The directory still accepts writes after clear
        store
            .set(CacheEntry::new("k3", vec![0u8; 4]))
            .await
            .unwrap();
        assert_eq!(store.usage().await, 4);
    }

    #[tokio::test]
    async fn test_get_all_skips_unreadable_files() {
        let store = DiskStore::new(100).unwrap();

        store
            .set(CacheEntry::new("good", b"data".to_vec()))
            .await
            .unwrap();

        // A file that is not a valid encoding must be skipped
        fs::write(store.dir.path().join("corrupt"), b"\xff\xff").unwrap();

        let entries = store.get_all().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "good");
    }

    #[tokio::test]
    async fn test_keys_lists_files() {
        let store = DiskStore::new(100).unwrap();

        store
            .set(CacheEntry::new("k1", b"a".to_vec()))
            .await
            .unwrap();
        store
            .set(CacheEntry::new("k2", b"b".to_vec()))
            .await
            .unwrap();

        let mut keys = store.keys().await;
        keys.sort();
        assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
    }
}
