//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Aggregation rounds (provider queries by outcome, normalized results)
//! - Provider health (blocks, search-type downgrades)
//! - Capability discovery

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Aggregation Metrics
// =============================================================================

/// Provider queries by family and outcome.
pub static PROVIDER_QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shelfscout_provider_queries_total",
            "Total provider queries by family and outcome",
        ),
        &["family", "result"], // "success", "failure", "malformed", "skipped", "blocked"
    )
    .unwrap()
});

/// Results kept after normalization, by family.
pub static RESULTS_NORMALIZED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shelfscout_results_normalized_total",
            "Results normalized and returned, by family",
        ),
        &["family"],
    )
    .unwrap()
});

/// Results dropped by the retention window.
pub static RESULTS_AGED_OUT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "shelfscout_results_aged_out_total",
        "Indexer results older than the retention window",
    )
    .unwrap()
});

// =============================================================================
// Provider Health Metrics
// =============================================================================

/// Blocklist insertions.
pub static PROVIDERS_BLOCKED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "shelfscout_providers_blocked_total",
        "Providers added to the blocklist",
    )
    .unwrap()
});

/// Dedicated search verbs disabled after a protocol rejection.
pub static SEARCH_TYPE_DOWNGRADES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shelfscout_search_type_downgrades_total",
            "Search verbs disabled after an unsupported-query error",
        ),
        &["verb"], // "book_search", "audio_search"
    )
    .unwrap()
});

// =============================================================================
// Capability Metrics
// =============================================================================

/// Capability discovery attempts by result.
pub static CAPABILITY_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "shelfscout_capability_refreshes_total",
            "Capability discovery attempts",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Registration Helper
// =============================================================================

/// Get all core metrics for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Aggregation
        Box::new(PROVIDER_QUERIES.clone()),
        Box::new(RESULTS_NORMALIZED.clone()),
        Box::new(RESULTS_AGED_OUT.clone()),
        // Provider health
        Box::new(PROVIDERS_BLOCKED.clone()),
        Box::new(SEARCH_TYPE_DOWNGRADES.clone()),
        // Capabilities
        Box::new(CAPABILITY_REFRESHES.clone()),
    ]
}
