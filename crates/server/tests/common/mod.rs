//! Common test utilities for router testing with a scripted fetcher.
//!
//! The fixture builds the real router over an in-memory provider store and
//! a [`MockFetcher`], so every route can be exercised without network access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use shelfscout_core::{
    testing::MockFetcher, Aggregator, Blocklist, Config, MemoryProviderStore, Provider,
    ProviderStore, SearchSettings,
};
use shelfscout_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use shelfscout_core::testing::fixtures;

/// Test fixture wiring the router to mock dependencies.
pub struct TestFixture {
    pub router: Router,
    /// Scripted remote responses, keyed by URL substring.
    pub fetcher: Arc<MockFetcher>,
    pub store: Arc<dyn ProviderStore>,
    pub blocklist: Arc<Blocklist>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self::with_settings(providers, SearchSettings::default())
    }

    pub fn with_settings(providers: Vec<Provider>, settings: SearchSettings) -> Self {
        let fetcher = Arc::new(MockFetcher::new());
        let store: Arc<dyn ProviderStore> = Arc::new(MemoryProviderStore::new(providers));
        let blocklist = Arc::new(Blocklist::from_settings(&settings));

        let config = Config {
            search: settings.clone(),
            ..Default::default()
        };
        let aggregator = Arc::new(Aggregator::new(
            settings,
            fetcher.clone(),
            store.clone(),
            blocklist.clone(),
        ));
        let state = Arc::new(AppState::new(config, aggregator));

        Self {
            router: create_router(state),
            fetcher,
            store,
            blocklist,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let request_builder = Request::builder().method(method).uri(path);

        let request = match body {
            Some(json) => request_builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => request_builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}
