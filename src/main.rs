use anyhow::Result;
use stratacache::{CacheConfig, LruPolicy, Store, TieredCache};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting stratacache demo v{}", env!("CARGO_PKG_VERSION"));

    let config = CacheConfig::default();
    let cache = TieredCache::with_config(&config).await?;

    cache.set("key1", b"value1".to_vec()).await?;
    cache.set("key2", b"value2".to_vec()).await?;

    match cache.get("key1").await {
        Ok(value) => println!("key1: {}", String::from_utf8_lossy(&value)),
        Err(e) => println!("Error getting key1: {}", e),
    }

    let (hits, misses) = cache.stats().await;
    println!("Cache stats - hits: {}, misses: {}", hits, misses);

    cache.set("key3", b"value3".to_vec()).await?;
    cache.set("key4", b"value4".to_vec()).await?;

    for key in ["key1", "key2", "key3", "key4", "key5"] {
        match cache.get(key).await {
            Ok(value) => println!("{}: {}", key, String::from_utf8_lossy(&value)),
            Err(_) => println!("{}: not found", key),
        }
    }

    println!("\nDemonstrating eviction:");
    let small_cache = TieredCache::new(20, 40, &config.remote_addr, Box::new(LruPolicy)).await?;

    small_cache.set("key1", b"value1".to_vec()).await?;
    small_cache.set("key2", b"value2".to_vec()).await?;
    small_cache.set("key3", b"value3".to_vec()).await?;

    println!("Cache state after setting key1, key2, key3:");
    print_cache_state(&small_cache).await;

    println!("Setting key4 (should trigger eviction):");
    small_cache.set("key4", b"longvalue4".to_vec()).await?;

    println!("Cache state after setting key4:");
    print_cache_state(&small_cache).await;

    Ok(())
}

async fn print_cache_state(cache: &TieredCache) {
    println!("Fast tier:");
    for key in cache.fast_store().keys().await {
        if let Ok(entry) = cache.fast_store().get(&key).await {
            println!("  {}: {}", key, String::from_utf8_lossy(&entry.value));
        }
    }

    println!("Local tier:");
    for key in cache.local_store().keys().await {
        if let Ok(entry) = cache.local_store().get(&key).await {
            println!("  {}: {}", key, String::from_utf8_lossy(&entry.value));
        }
    }
}
