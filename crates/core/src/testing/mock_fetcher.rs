//! Mock fetcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetch::{FetchError, Fetcher};

/// A canned answer for URLs containing `pattern`.
#[derive(Debug, Clone)]
struct Route {
    pattern: String,
    response: Result<String, FetchError>,
}

/// Mock implementation of the Fetcher trait.
///
/// Routes match on URL substrings; the most recently added matching route
/// wins. Unrouted URLs fail with a connection error. Every requested URL is
/// recorded.
///
/// # Example
///
/// ```rust,ignore
/// use shelfscout_core::testing::{MockFetcher, fixtures};
///
/// let fetcher = MockFetcher::new();
/// fetcher.respond("t=caps", fixtures::CAPS_XML).await;
/// fetcher.fail("t=book", FetchError::Timeout).await;
///
/// // ... run an aggregation round ...
///
/// assert_eq!(fetcher.requests().await.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockFetcher {
    routes: Arc<RwLock<Vec<Route>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer URLs containing `pattern` with `body`.
    pub async fn respond(&self, pattern: &str, body: &str) {
        self.routes.write().await.push(Route {
            pattern: pattern.to_string(),
            response: Ok(body.to_string()),
        });
    }

    /// Fail URLs containing `pattern` with `error`.
    pub async fn fail(&self, pattern: &str, error: FetchError) {
        self.routes.write().await.push(Route {
            pattern: pattern.to_string(),
            response: Err(error),
        });
    }

    /// URLs requested so far, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    pub async fn clear_requests(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.write().await.push(url.to_string());

        let routes = self.routes.read().await;
        routes
            .iter()
            .rev()
            .find(|r| url.contains(&r.pattern))
            .map(|r| r.response.clone())
            .unwrap_or_else(|| Err(FetchError::Connection(format!("no route for {}", url))))
    }
}
