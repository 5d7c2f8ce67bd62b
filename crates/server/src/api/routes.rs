use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::{blocklist, handlers, middleware::metrics_middleware, providers, search};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Aggregated search
        .route("/search", post(search::search))
        .route("/wishlists", get(search::wishlists))
        // Providers
        .route("/providers", get(providers::list_providers))
        .route("/providers/{name}", get(providers::get_provider))
        .route(
            "/providers/{name}/capabilities",
            post(providers::refresh_capabilities),
        )
        .route("/providers/{name}/test", post(providers::test_provider))
        // Blocklist
        .route("/blocklist", get(blocklist::list_blocklist))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
