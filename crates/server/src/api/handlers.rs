use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use shelfscout_core::{SanitizedConfig, SearchError, StoreError};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                error: error.into(),
            }),
        )
    }
}

/// Map an aggregator error onto an HTTP status.
pub fn search_error_response(err: SearchError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        SearchError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        SearchError::Provider(_) => StatusCode::BAD_REQUEST,
        SearchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SearchError::Fetch(_) | SearchError::Malformed(_) => StatusCode::BAD_GATEWAY,
    };
    ErrorResponse::new(status, err.to_string())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /api/v1/metrics
///
/// Prometheus text exposition format.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
