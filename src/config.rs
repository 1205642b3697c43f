use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::policy::{EvictionPolicy, LruPolicy};

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Fast tier capacity in bytes
    pub fast_capacity_bytes: u64,
    /// Local tier capacity in bytes
    pub local_capacity_bytes: u64,
    /// Remote store address (host:port)
    pub remote_addr: String,
    /// Eviction policy for the capacity-bounded tiers
    #[serde(default)]
    pub eviction_policy: PolicyKind,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Selectable eviction policies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Least recently accessed
    #[default]
    Lru,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fast_capacity_bytes: 64 * 1024 * 1024,
            local_capacity_bytes: 512 * 1024 * 1024,
            remote_addr: "localhost:6379".to_string(),
            eviction_policy: PolicyKind::Lru,
            logging: LoggingConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CacheConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Instantiate the configured eviction policy
    pub fn build_policy(&self) -> Box<dyn EvictionPolicy> {
        match self.eviction_policy {
            PolicyKind::Lru => Box::new(LruPolicy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.fast_capacity_bytes, 64 * 1024 * 1024);
        assert_eq!(config.local_capacity_bytes, 512 * 1024 * 1024);
        assert_eq!(config.remote_addr, "localhost:6379");
        assert_eq!(config.eviction_policy, PolicyKind::Lru);
        assert!(config.fast_capacity_bytes <= config.local_capacity_bytes);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
fast_capacity_bytes: 1024
local_capacity_bytes: 4096
remote_addr: "cache.internal:6379"
eviction_policy: lru
logging:
  level: debug
"#;
        let config: CacheConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fast_capacity_bytes, 1024);
        assert_eq!(config.local_capacity_bytes, 4096);
        assert_eq!(config.remote_addr, "cache.internal:6379");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_yaml_with_defaults() {
        let yaml = r#"
fast_capacity_bytes: 1024
local_capacity_bytes: 4096
remote_addr: "localhost:6379"
"#;
        let config: CacheConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.eviction_policy, PolicyKind::Lru);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;

        let yaml = r#"
fast_capacity_bytes: 2048
local_capacity_bytes: 8192
remote_addr: "cache.internal:6380"
eviction_policy: lru
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = CacheConfig::from_file(file.path()).unwrap();
        assert_eq!(config.fast_capacity_bytes, 2048);
        assert_eq!(config.local_capacity_bytes, 8192);
        assert_eq!(config.remote_addr, "cache.internal:6380");
        assert_eq!(config.eviction_policy, PolicyKind::Lru);
    }

    #[test]
    fn test_from_file_missing_path() {
        let result = CacheConfig::from_file("/nonexistent/stratacache.yaml");
        assert!(result.is_err());
    }
}
