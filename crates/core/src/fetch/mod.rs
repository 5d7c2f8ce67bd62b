//! HTTP fetch capability used by every provider call.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use thiserror::Error;

/// Why a fetch produced no body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    /// Non-success status; `status` carries the reason phrase
    /// (e.g. "400 Bad Request").
    #[error("HTTP {status}: {body}")]
    Status { status: String, body: String },

    #[error("Failed to read response: {0}")]
    Body(String),
}

/// Fetches a URL and returns the response body as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
