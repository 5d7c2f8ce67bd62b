//! Prometheus metrics for the HTTP service.
//!
//! Request metrics are defined here; provider and aggregation metrics come
//! from `shelfscout_core::metrics` and are registered into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use shelfscout_core::ProviderStore;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "shelfscout_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfscout_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "shelfscout_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Provider Metrics (collected dynamically)
// =============================================================================

/// Providers currently on the blocklist.
pub static PROVIDERS_BLOCKED_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "shelfscout_providers_blocked_active",
        "Number of providers currently on the blocklist",
    )
    .unwrap()
});

/// Configured providers.
pub static PROVIDERS_CONFIGURED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "shelfscout_providers_configured",
        "Number of providers in the provider store",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Providers
    registry
        .register(Box::new(PROVIDERS_BLOCKED_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(PROVIDERS_CONFIGURED.clone()))
        .unwrap();

    // Core metrics (aggregation rounds, blocklist, capabilities)
    for metric in shelfscout_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh gauges from current application state before encoding.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    PROVIDERS_BLOCKED_ACTIVE.set(state.blocklist().entries().await.len() as i64);
    PROVIDERS_CONFIGURED.set(state.store().list().await.len() as i64);
}

static PROVIDER_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/api/v1/providers/)[^/]+(/|$)").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace provider names and ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = PROVIDER_SEGMENT.replace(path, "${1}{name}${2}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_provider_name() {
        assert_eq!(
            normalize_path("/api/v1/providers/NZBgeek/capabilities"),
            "/api/v1/providers/{name}/capabilities"
        );
        assert_eq!(
            normalize_path("/api/v1/providers/Libgen"),
            "/api/v1/providers/{name}"
        );
    }

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/things/12345"), "/api/v1/things/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/providers"), "/api/v1/providers");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("shelfscout_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_includes_core_metrics() {
        shelfscout_core::metrics::PROVIDERS_BLOCKED.inc_by(0);
        PROVIDERS_CONFIGURED.set(0);

        let output = encode_metrics();
        assert!(output.contains("shelfscout_providers_blocked_total"));
        assert!(output.contains("shelfscout_providers_configured"));
    }
}
