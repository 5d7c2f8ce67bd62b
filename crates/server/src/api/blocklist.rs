use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use shelfscout_core::BlocklistEntry;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BlocklistResponse {
    pub entries: Vec<BlocklistEntry>,
}

/// GET /api/v1/blocklist
///
/// Providers currently cooling down, soonest to resume first.
pub async fn list_blocklist(State(state): State<Arc<AppState>>) -> Json<BlocklistResponse> {
    Json(BlocklistResponse {
        entries: state.blocklist().entries().await,
    })
}
