use super::EvictionPolicy;
use crate::core::entry::CacheEntry;

/// Least-recently-accessed: the victim is the entry with the smallest
/// `last_access` timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct LruPolicy;

impl EvictionPolicy for LruPolicy {
    fn choose(&self, entries: &[CacheEntry]) -> Option<String> {
        entries
            .iter()
            .min_by_key(|entry| entry.last_access)
            .map(|entry| entry.key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_access(key: &str, last_access: u64) -> CacheEntry {
        let mut entry = CacheEntry::new(key, b"v".to_vec());
        entry.last_access = last_access;
        entry
    }

    #[test]
    fn test_chooses_oldest() {
        let entries = vec![
            entry_with_access("newer", 3000),
            entry_with_access("oldest", 1000),
            entry_with_access("middle", 2000),
        ];

        let policy = LruPolicy;
        assert_eq!(policy.choose(&entries), Some("oldest".to_string()));
    }

    #[test]
    fn test_empty_snapshot() {
        let policy = LruPolicy;
        assert_eq!(policy.choose(&[]), None);
    }

    #[test]
    fn test_single_entry() {
        let policy = LruPolicy;
        let entries = vec![entry_with_access("only", 42)];
        assert_eq!(policy.choose(&entries), Some("only".to_string()));
    }

    #[test]
    fn test_deterministic_for_unchanged_snapshot() {
        let entries = vec![
            entry_with_access("a", 500),
            entry_with_access("b", 100),
            entry_with_access("c", 900),
        ];

        let policy = LruPolicy;
        let first = policy.choose(&entries);
        for _ in 0..10 {
            assert_eq!(policy.choose(&entries), first);
        }
    }
}
