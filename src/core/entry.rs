use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The unit of storage across all tiers: an opaque payload plus the access
/// metadata the eviction policy decides on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Identity of the entry across all tiers
    pub key: String,
    /// Opaque payload, immutable once written
    pub value: Vec<u8>,
    /// Byte length charged against tier capacity
    pub size: u64,
    /// Unix timestamp in milliseconds of the most recent successful access
    pub last_access: u64,
    /// Successful accesses since admission (1 at first write)
    pub frequency: u64,
}

impl CacheEntry {
    /// Build a fresh entry at admission time
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        let size = value.len() as u64;
        Self {
            key: key.into(),
            value,
            size,
            last_access: now_millis(),
            frequency: 1,
        }
    }

    /// Refresh recency and frequency after a successful access
    pub fn touch(&mut self) {
        self.last_access = now_millis();
        self.frequency += 1;
    }
}

/// Current Unix timestamp in milliseconds
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry() {
        let entry = CacheEntry::new("key1", b"value1".to_vec());
        assert_eq!(entry.key, "key1");
        assert_eq!(entry.value, b"value1".to_vec());
        assert_eq!(entry.size, 6);
        assert_eq!(entry.frequency, 1);
        assert!(entry.last_access > 0);
    }

    #[test]
    fn test_touch_updates_metadata() {
        let mut entry = CacheEntry::new("key1", b"value1".to_vec());
        let before = entry.last_access;

        std::thread::sleep(std::time::Duration::from_millis(5));
        entry.touch();

        assert_eq!(entry.frequency, 2);
        assert!(entry.last_access >= before);
    }

    #[test]
    fn test_entry_roundtrips_through_bincode() {
        let entry = CacheEntry::new("key1", vec![0, 1, 2, 255]);
        let encoded = bincode::serialize(&entry).unwrap();
        let decoded: CacheEntry = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, entry);
    }
}
