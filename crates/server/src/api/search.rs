//! Aggregated search API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use shelfscout_core::{Aggregate, ResultRecord, SearchRequest, SearchType, WishlistEntry};
use tracing::info;

use super::handlers::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Which provider families a search round covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFamily {
    /// Newznab/torznab indexers, torrent sites and direct-download sites.
    #[default]
    All,
    Newznab,
    TorrentSite,
    DirectScrape,
    Rss,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub search_type: SearchType,
    #[serde(default)]
    pub family: SearchFamily,
    #[serde(flatten)]
    pub request: SearchRequest,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search_type: SearchType,
    pub family: SearchFamily,
    pub results: Vec<ResultRecord>,
    pub providers_queried: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub entries: Vec<WishlistEntry>,
    pub providers_queried: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/search
///
/// Run one aggregation round across the selected provider family.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorResponse>)> {
    let SearchBody {
        search_type,
        family,
        mut request,
    } = body;

    if request.term.trim().is_empty() {
        request.term = format!("{} {}", request.author.trim(), request.title.trim())
            .trim()
            .to_string();
    }
    if family != SearchFamily::Rss && request.term.is_empty() {
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "Search needs a term or an author and title",
        ));
    }

    let start = Instant::now();
    let aggregator = state.aggregator();
    let aggregate: Aggregate<ResultRecord> = match family {
        SearchFamily::All => aggregator.query_all(&request, search_type).await,
        SearchFamily::Newznab => aggregator.query_newznab(&request, search_type).await,
        SearchFamily::TorrentSite => aggregator.query_torrent_sites(&request, search_type).await,
        SearchFamily::DirectScrape => aggregator.query_direct_sites(&request, search_type).await,
        SearchFamily::Rss => aggregator.query_rss().await,
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    info!(
        search_type = %search_type,
        family = ?family,
        providers = aggregate.providers_queried,
        results = aggregate.results.len(),
        duration_ms,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        search_type,
        family,
        results: aggregate.results,
        providers_queried: aggregate.providers_queried,
        duration_ms,
    }))
}

/// GET /api/v1/wishlists
///
/// Collect wanted-book entries from every enabled wishlist provider.
pub async fn wishlists(State(state): State<Arc<AppState>>) -> Json<WishlistResponse> {
    let aggregate = state.aggregator().query_wishlists().await;
    Json(WishlistResponse {
        entries: aggregate.results,
        providers_queried: aggregate.providers_queried,
    })
}
