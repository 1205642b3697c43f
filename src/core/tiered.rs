use crate::config::CacheConfig;
use crate::core::entry::CacheEntry;
use crate::core::error::{CacheError, Result};
use crate::metrics;
use crate::policy::EvictionPolicy;
use crate::store::{DiskStore, MemoryStore, RemoteStore, Store, TierLevel};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Coordinator over the three tier stores.
///
/// Reads probe fast -> local -> remote and promote colder hits into the
/// fast tier; writes cascade in the same order, evicting residents into the
/// next colder tier to make room. One reader/writer lock serializes
/// operations: `get`, `keys` and `stats` run shared, everything that
/// installs or removes entries runs exclusive. Hit/miss counters are
/// atomics so shared readers can record outcomes without upgrading.
pub struct TieredCache {
    op_lock: RwLock<()>,
    fast: MemoryStore,
    local: DiskStore,
    remote: RemoteStore,
    policy: Box<dyn EvictionPolicy>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TieredCache {
    /// Build a cache with the given tier capacities (bytes) and eviction
    /// policy. Fails if the local scratch directory cannot be created or a
    /// live remote store is unreachable.
    pub async fn new(
        fast_capacity: u64,
        local_capacity: u64,
        remote_addr: &str,
        policy: Box<dyn EvictionPolicy>,
    ) -> Result<Self> {
        info!(
            "Initializing tiered cache (fast={}B, local={}B, remote={})",
            fast_capacity, local_capacity, remote_addr
        );
        if fast_capacity > local_capacity {
            warn!(
                "Fast tier capacity {} exceeds local tier capacity {}; demotion may drop entries",
                fast_capacity, local_capacity
            );
        }

        let fast = MemoryStore::new(fast_capacity);
        let local = DiskStore::new(local_capacity)?;
        let remote = RemoteStore::new(remote_addr).await?;

        Ok(Self::with_stores(fast, local, remote, policy))
    }

    /// Build a cache from configuration
    pub async fn with_config(config: &CacheConfig) -> Result<Self> {
        Self::new(
            config.fast_capacity_bytes,
            config.local_capacity_bytes,
            &config.remote_addr,
            config.build_policy(),
        )
        .await
    }

    fn with_stores(
        fast: MemoryStore,
        local: DiskStore,
        remote: RemoteStore,
        policy: Box<dyn EvictionPolicy>,
    ) -> Self {
        Self {
            op_lock: RwLock::new(()),
            fast,
            local,
            remote,
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a key across all tiers, hottest first. A hit refreshes the
    /// entry's recency and frequency; a hit below the fast tier also copies
    /// the entry into the fast tier.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let _guard = self.op_lock.read().await;
        let _timer = metrics::CACHE_OP_DURATION
            .with_label_values(&["get"])
            .start_timer();
        debug!("GET key={}", key);

        match self.fast.get(key).await {
            Ok(mut entry) => {
                entry.touch();
                // Same-key replace is a zero-delta write and cannot be
                // refused on capacity
                if let Err(e) = self.fast.set(entry.clone()).await {
                    debug!("Failed to refresh {} in fast tier: {}", key, e);
                }
                self.record_hit(TierLevel::Fast);
                return Ok(entry.value);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match self.local.get(key).await {
            Ok(mut entry) => {
                entry.touch();
                self.record_hit(TierLevel::Local);
                self.promote(entry.clone()).await;
                return Ok(entry.value);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match self.remote.get(key).await {
            Ok(mut entry) => {
                entry.touch();
                self.record_hit(TierLevel::Remote);
                self.promote(entry.clone()).await;
                return Ok(entry.value);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::CACHE_OPS_TOTAL
            .with_label_values(&["get", "miss"])
            .inc();
        Err(CacheError::KeyNotFound(key.to_string()))
    }

    /// Admit a new entry. Insertion is attempted in the fast tier first;
    /// a capacity refusal triggers eviction into colder tiers and one
    /// retry, then the write falls through to the next tier. The result of
    /// the remote tier is the caller's answer of last resort, so a
    /// successful `set` never reports `InsufficientCapacity`.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidValue("key must not be empty".to_string()));
        }

        let _guard = self.op_lock.write().await;
        let _timer = metrics::CACHE_OP_DURATION
            .with_label_values(&["set"])
            .start_timer();
        let entry = CacheEntry::new(key, value);
        debug!("SET key={} size={}", key, entry.size);

        let result = self.admit(entry).await;
        self.publish_usage().await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::CACHE_OPS_TOTAL
            .with_label_values(&["set", status])
            .inc();
        result
    }

    async fn admit(&self, entry: CacheEntry) -> Result<()> {
        match self.fast.set(entry.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_insufficient_capacity() => {
                if self.evict(TierLevel::Fast, entry.size).await {
                    match self.fast.set(entry.clone()).await {
                        Ok(()) => return Ok(()),
                        Err(e) if e.is_insufficient_capacity() => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            Err(e) => return Err(e),
        }

        match self.local.set(entry.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_insufficient_capacity() => {
                if self.evict(TierLevel::Local, entry.size).await {
                    match self.local.set(entry.clone()).await {
                        Ok(()) => return Ok(()),
                        Err(e) if e.is_insufficient_capacity() => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            Err(e) => return Err(e),
        }

        self.remote.set(entry).await
    }

    /// Best-effort removal from every tier. Absent keys are ignored; the
    /// first other failure is reported after all tiers have been attempted.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.op_lock.write().await;
        debug!("DELETE key={}", key);

        let mut first_err = None;
        for store in self.stores() {
            if let Err(e) = store.delete(key).await {
                if !e.is_not_found() && first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        self.publish_usage().await;
        metrics::CACHE_OPS_TOTAL
            .with_label_values(&["delete", if first_err.is_none() { "ok" } else { "error" }])
            .inc();

        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Remove every entry from every tier
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.op_lock.write().await;
        debug!("CLEAR");

        let mut first_err = None;
        for store in self.stores() {
            if let Err(e) = store.clear().await {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        self.publish_usage().await;
        metrics::CACHE_OPS_TOTAL
            .with_label_values(&["clear", if first_err.is_none() { "ok" } else { "error" }])
            .inc();

        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// All resident keys across the tiers, hottest tier first. Promotion
    /// leaves copies in colder tiers, so duplicates are collapsed.
    pub async fn keys(&self) -> Vec<String> {
        let _guard = self.op_lock.read().await;

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for store in self.stores() {
            for key in store.keys().await {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Hit and miss counters since construction or the last reset
    pub async fn stats(&self) -> (u64, u64) {
        let _guard = self.op_lock.read().await;
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Zero the hit and miss counters
    pub async fn reset_stats(&self) {
        let _guard = self.op_lock.write().await;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn fast_store(&self) -> &MemoryStore {
        &self.fast
    }

    pub fn local_store(&self) -> &DiskStore {
        &self.local
    }

    pub fn remote_store(&self) -> &RemoteStore {
        &self.remote
    }

    fn stores(&self) -> [&dyn Store; 3] {
        [&self.fast, &self.local, &self.remote]
    }

    fn store_for(&self, tier: TierLevel) -> &dyn Store {
        match tier {
            TierLevel::Fast => &self.fast,
            TierLevel::Local => &self.local,
            TierLevel::Remote => &self.remote,
        }
    }

    fn record_hit(&self, tier: TierLevel) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::CACHE_OPS_TOTAL
            .with_label_values(&["get", "hit"])
            .inc();
        metrics::CACHE_TIER_HITS
            .with_label_values(&[tier.as_str()])
            .inc();
    }

    async fn publish_usage(&self) {
        metrics::TIER_USAGE_BYTES
            .with_label_values(&["fast"])
            .set(self.fast.usage().await);
        metrics::TIER_USAGE_BYTES
            .with_label_values(&["local"])
            .set(self.local.usage().await);
    }

    /// Copy an entry read from a colder tier into the fast tier, making
    /// room first if needed. The read already succeeded, so failures here
    /// are swallowed. The colder copy stays in place.
    async fn promote(&self, entry: CacheEntry) {
        if self.fast.usage().await + entry.size as i64 > self.fast.capacity().await {
            self.evict(TierLevel::Fast, entry.size).await;
        }
        if let Err(e) = self.fast.set(entry).await {
            debug!("Promotion into fast tier failed: {}", e);
        }
    }

    /// Free at least `required` bytes in `tier` by evicting policy-chosen
    /// victims into the next colder tier. Returns whether enough room was
    /// made. Every iteration removes one entry or bails, so the loop is
    /// bounded by the tier's population.
    fn evict(
        &self,
        tier: TierLevel,
        required: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            let store = self.store_for(tier);

            loop {
                let free = store.capacity().await.saturating_sub(store.usage().await);
                if free >= required as i64 {
                    return true;
                }

                let entries = store.get_all().await;
                if entries.is_empty() {
                    return false;
                }
                let Some(victim_key) = self.policy.choose(&entries) else {
                    return false;
                };

                let victim = store.get(&victim_key).await.ok();
                if let Err(e) = store.delete(&victim_key).await {
                    warn!("Failed to evict {} from {} tier: {}", victim_key, tier, e);
                    return false;
                }
                debug!("Evicted {} from {} tier", victim_key, tier);
                metrics::CACHE_EVICTIONS_TOTAL
                    .with_label_values(&[tier.as_str()])
                    .inc();

                if let Some(victim) = victim {
                    self.demote(tier, victim).await;
                }
            }
        })
    }

    /// Hand an evicted entry to the next colder tier, evicting there once
    /// if it is full. An entry with no colder tier, or one larger than the
    /// target tier, is dropped.
    fn demote(
        &self,
        from: TierLevel,
        entry: CacheEntry,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let Some(next) = from.next() else {
                warn!(
                    "Dropping {} evicted from {} tier: no colder tier",
                    entry.key, from
                );
                return;
            };
            let store = self.store_for(next);

            let capacity = store.capacity().await;
            if capacity >= 0 && entry.size as i64 > capacity {
                warn!(
                    "Dropping {} evicted from {} tier: {} bytes exceed {} tier capacity",
                    entry.key, from, entry.size, next
                );
                return;
            }

            match store.set(entry.clone()).await {
                Ok(()) => debug!("Demoted {} from {} to {} tier", entry.key, from, next),
                Err(e) if e.is_insufficient_capacity() => {
                    if self.evict(next, entry.size).await {
                        if let Err(e) = store.set(entry.clone()).await {
                            warn!(
                                "Failed to demote {} to {} tier after eviction: {}",
                                entry.key, next, e
                            );
                        }
                    } else {
                        warn!("Could not make room in {} tier for {}", next, entry.key);
                    }
                }
                Err(e) => warn!("Failed to demote {} to {} tier: {}", entry.key, next, e),
            }
        })
    }
}
