// Metrics module for Prometheus observability
// Author: storecache contributors

mod registry;

pub use registry::{
    gather_metrics,
    FETCH_EVENTS,
    FETCH_DURATION,
    CACHE_OPERATIONS,
    PRECACHE_RESULTS,
    LIFECYCLE_TRANSITIONS,
    STORES_DELETED,
    ACTIVE_GENERATION,
};

/// Helper to record a handled fetch
pub fn record_fetch(route: &str, source: &str, duration_secs: f64) {
    FETCH_EVENTS.with_label_values(&[route, source]).inc();
    FETCH_DURATION.with_label_values(&[route]).observe(duration_secs);
}

pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_put() {
    CACHE_OPERATIONS.with_label_values(&["put"]).inc();
}

pub fn record_revalidation() {
    CACHE_OPERATIONS.with_label_values(&["revalidate"]).inc();
}

pub fn record_precache(stored: bool) {
    let result = if stored { "stored" } else { "failed" };
    PRECACHE_RESULTS.with_label_values(&[result]).inc();
}

pub fn record_transition(state: &str) {
    LIFECYCLE_TRANSITIONS.with_label_values(&[state]).inc();
}

pub fn record_store_deleted(prefix: &str) {
    STORES_DELETED.with_label_values(&[prefix]).inc();
}

/// Mark `active` as the intercepting version and clear `previous`
pub fn set_active_generation(active: &str, previous: Option<&str>) {
    if let Some(previous) = previous {
        ACTIVE_GENERATION.with_label_values(&[previous]).set(0.0);
    }
    ACTIVE_GENERATION.with_label_values(&[active]).set(1.0);
}
