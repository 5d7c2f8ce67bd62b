//! Provider inspection and maintenance handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shelfscout_core::{Provider, ProviderStore, ProviderTestReport};

use super::handlers::{search_error_response, ErrorResponse};
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<Provider>,
}

/// GET /api/v1/providers
///
/// Every configured provider, with API keys masked.
pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    let providers = state
        .store()
        .list()
        .await
        .iter()
        .map(Provider::redacted)
        .collect();
    Json(ProvidersResponse { providers })
}

/// GET /api/v1/providers/{name}
pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Provider>, ApiError> {
    match state.store().get(&name).await {
        Some(provider) => Ok(Json(provider.redacted())),
        None => Err(ErrorResponse::new(
            StatusCode::NOT_FOUND,
            format!("Provider not found: {}", name),
        )),
    }
}

/// POST /api/v1/providers/{name}/capabilities
///
/// Rediscover an indexer's capabilities now, whatever their age.
pub async fn refresh_capabilities(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Provider>, ApiError> {
    state
        .aggregator()
        .refresh_capabilities(&name)
        .await
        .map(|provider| Json(provider.redacted()))
        .map_err(search_error_response)
}

/// POST /api/v1/providers/{name}/test
///
/// Probe a provider once. Failures are reported, not blocklisted.
pub async fn test_provider(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ProviderTestReport>, ApiError> {
    state
        .aggregator()
        .test_provider(&name)
        .await
        .map(Json)
        .map_err(search_error_response)
}
