// Prometheus metrics registry and collectors
// Author: storecache contributors

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // FETCH METRICS
    // ============================================================================

    /// Intercepted fetches by route and by where the response came from
    pub static ref FETCH_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("fetch_events_total", "Total intercepted fetch events"),
        &["route", "source"], // source: cache, network, offline-fallback, passthrough, error
        REGISTRY
    ).unwrap();

    /// Fetch handling duration
    pub static ref FETCH_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("fetch_duration_seconds", "Fetch handling duration in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["route"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["operation"], // operation: hit, miss, put, revalidate
        REGISTRY
    ).unwrap();

    /// Precache outcome per asset
    pub static ref PRECACHE_RESULTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("precache_results_total", "Precache results per asset"),
        &["result"], // result: stored, failed
        REGISTRY
    ).unwrap();

    // ============================================================================
    // LIFECYCLE METRICS
    // ============================================================================

    /// Generation state transitions
    pub static ref LIFECYCLE_TRANSITIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("lifecycle_transitions_total", "Cache generation state transitions"),
        &["state"],
        REGISTRY
    ).unwrap();

    /// Stores deleted during activation
    pub static ref STORES_DELETED: CounterVec = register_counter_vec_with_registry!(
        Opts::new("stores_deleted_total", "Stale stores deleted during activation"),
        &["prefix"],
        REGISTRY
    ).unwrap();

    /// Currently active generation, labelled by version tag
    pub static ref ACTIVE_GENERATION: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("active_generation", "1 for the version tag currently intercepting fetches"),
        &["version"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
