//! Prometheus metrics for the tiered cache
//!
//! Collected by the coordinator on every operation:
//! - operation counters by type and status
//! - hit counters by tier
//! - per-tier usage gauges

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder, register_histogram_vec,
    register_int_counter_vec, register_int_gauge_vec,
};

lazy_static! {
    /// Total coordinator operations by type (get, set, delete, clear)
    pub static ref CACHE_OPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stratacache_operations_total",
        "Total number of cache operations by type",
        &["operation", "status"]
    ).unwrap();

    /// Read hits by the tier that answered
    pub static ref CACHE_TIER_HITS: IntCounterVec = register_int_counter_vec!(
        "stratacache_tier_hits_total",
        "Read hits by serving tier",
        &["tier"]
    ).unwrap();

    /// Entries evicted from a tier (and demoted to the next colder one)
    pub static ref CACHE_EVICTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stratacache_evictions_total",
        "Entries evicted by source tier",
        &["tier"]
    ).unwrap();

    /// Current usage of each tier in bytes
    pub static ref TIER_USAGE_BYTES: IntGaugeVec = register_int_gauge_vec!(
        "stratacache_tier_usage_bytes",
        "Current usage of each tier in bytes",
        &["tier"]
    ).unwrap();

    /// Coordinator operation latency in seconds
    pub static ref CACHE_OP_DURATION: HistogramVec = register_histogram_vec!(
        "stratacache_operation_duration_seconds",
        "Cache operation latency in seconds",
        &["operation"],
        vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]
    ).unwrap();
}

/// Render all registered metrics in the Prometheus text format
pub fn export_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
