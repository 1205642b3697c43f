use super::Store;
use crate::core::entry::CacheEntry;
use crate::core::error::{CacheError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Synthetic capacity reported by the simulated backend (100 MiB)
const SIMULATED_CAPACITY: i64 = 100 * 1024 * 1024;

/// Capacity and usage figures reported by the remote tier
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMetrics {
    pub capacity: i64,
    pub usage: i64,
    pub usage_percent: f64,
}

enum RemoteBackend {
    /// Proxy to a live Redis server
    Live(ConnectionManager),
    /// In-process map used when SIMULATE_REMOTE_STORE=true
    Simulated(RwLock<HashMap<String, Vec<u8>>>),
}

/// Remote tier: a shared key/value server, or an in-process simulation of
/// one. The mode is captured once at construction and never re-read.
pub struct RemoteStore {
    backend: RemoteBackend,
}

impl RemoteStore {
    /// Connect to the server at `addr` (host:port). When the process
    /// environment carries `SIMULATE_REMOTE_STORE=true` the connection is
    /// skipped and an in-process simulation is used instead.
    pub async fn new(addr: &str) -> Result<Self> {
        let simulate = std::env::var("SIMULATE_REMOTE_STORE")
            .map(|v| v == "true")
            .unwrap_or(false);
        if simulate {
            info!("Simulating remote store connection");
            return Ok(Self::simulated());
        }

        let client = redis::Client::open(format!("redis://{}", addr))?;
        let mut manager = client.get_connection_manager().await?;
        let _: String = redis::cmd("PING").query_async(&mut manager).await?;
        info!("Connected to remote store at {}", addr);

        Ok(Self {
            backend: RemoteBackend::Live(manager),
        })
    }

    /// Build a simulated store directly, without going through the
    /// environment
    pub fn simulated() -> Self {
        Self {
            backend: RemoteBackend::Simulated(RwLock::new(HashMap::new())),
        }
    }

    /// Capacity/usage figures of the backing server. Fails with a
    /// descriptive error when the server omits or malforms either figure.
    pub async fn metrics(&self) -> Result<StoreMetrics> {
        match &self.backend {
            RemoteBackend::Simulated(map) => {
                let usage: i64 = map.read().values().map(|v| v.len() as i64).sum();
                Ok(StoreMetrics {
                    capacity: SIMULATED_CAPACITY,
                    usage,
                    usage_percent: percent_of(usage, SIMULATED_CAPACITY),
                })
            }
            RemoteBackend::Live(manager) => {
                let mut conn = manager.clone();

                let config: HashMap<String, String> = redis::cmd("CONFIG")
                    .arg("GET")
                    .arg("maxmemory")
                    .query_async(&mut conn)
                    .await?;
                let capacity = config
                    .get("maxmemory")
                    .ok_or_else(|| {
                        CacheError::InvalidValue(
                            "maxmemory not found in remote configuration".to_string(),
                        )
                    })?
                    .parse::<i64>()
                    .map_err(|e| {
                        CacheError::InvalidValue(format!("failed to parse maxmemory: {}", e))
                    })?;

                let info: String = redis::cmd("INFO")
                    .arg("memory")
                    .query_async(&mut conn)
                    .await?;
                let usage = parse_used_memory(&info).ok_or_else(|| {
                    CacheError::InvalidValue(
                        "used_memory not found in remote memory info".to_string(),
                    )
                })?;

                Ok(StoreMetrics {
                    capacity,
                    usage,
                    usage_percent: percent_of(usage, capacity),
                })
            }
        }
    }
}

fn percent_of(usage: i64, capacity: i64) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    (usage as f64 / capacity as f64 * 100.0).clamp(0.0, 100.0)
}

fn parse_used_memory(info: &str) -> Option<i64> {
    info.lines()
        .map(|line| line.trim_end_matches('\r'))
        .find_map(|line| line.strip_prefix("used_memory:"))
        .and_then(|v| v.parse::<i64>().ok())
}

#[async_trait]
impl Store for RemoteStore {
    async fn get(&self, key: &str) -> Result<CacheEntry> {
        match &self.backend {
            RemoteBackend::Simulated(map) => {
                debug!("Simulating GET request to remote store");
                map.read()
                    .get(key)
                    .map(|value| CacheEntry::new(key, value.clone()))
                    .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
            }
            RemoteBackend::Live(manager) => {
                let mut conn = manager.clone();
                let value: Option<Vec<u8>> = conn.get(key).await?;
                value
                    .map(|value| CacheEntry::new(key, value))
                    .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
            }
        }
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        match &self.backend {
            RemoteBackend::Simulated(map) => {
                debug!("Simulating SET request to remote store");
                map.write().insert(entry.key, entry.value);
                Ok(())
            }
            RemoteBackend::Live(manager) => {
                let mut conn = manager.clone();
                let _: () = conn.set(&entry.key, &entry.value).await?;
                Ok(())
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match &self.backend {
            RemoteBackend::Simulated(map) => {
                map.write().remove(key);
                Ok(())
            }
            RemoteBackend::Live(manager) => {
                let mut conn = manager.clone();
                let _: () = conn.del(key).await?;
                Ok(())
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        match &self.backend {
            RemoteBackend::Simulated(map) => {
                debug!("Simulating CLEAR request to remote store");
                map.write().clear();
                Ok(())
            }
            RemoteBackend::Live(manager) => {
                let mut conn = manager.clone();
                let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
                Ok(())
            }
        }
    }

    async fn capacity(&self) -> i64 {
        match self.metrics().await {
            Ok(metrics) => metrics.capacity,
            Err(e) => {
                warn!("Error getting remote capacity: {}", e);
                -1
            }
        }
    }

    async fn usage(&self) -> i64 {
        match self.metrics().await {
            Ok(metrics) => metrics.usage,
            Err(e) => {
                warn!("Error getting remote usage: {}", e);
                0
            }
        }
    }

    async fn keys(&self) -> Vec<String> {
        match &self.backend {
            RemoteBackend::Simulated(map) => map.read().keys().cloned().collect(),
            RemoteBackend::Live(manager) => {
                let mut conn = manager.clone();
                let keys: redis::RedisResult<Vec<String>> = conn.keys("*").await;
                keys.unwrap_or_default()
            }
        }
    }

    async fn get_all(&self) -> Vec<CacheEntry> {
        match &self.backend {
            RemoteBackend::Simulated(map) => {
                debug!("Simulating GETALL request to remote store");
                map.read()
                    .iter()
                    .map(|(k, v)| CacheEntry::new(k.clone(), v.clone()))
                    .collect()
            }
            RemoteBackend::Live(_) => {
                let mut entries = Vec::new();
                for key in self.keys().await {
                    if let Ok(entry) = self.get(&key).await {
                        entries.push(entry);
                    }
                }
                entries
            }
        }
    }
}
