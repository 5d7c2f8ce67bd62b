//! reqwest-backed fetcher.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, Fetcher};
use crate::config::HttpConfig;

/// Longest error body kept in a [`FetchError::Status`].
const ERROR_BODY_LIMIT: usize = 200;

/// Fetcher sharing one HTTP client; the timeout applies to every request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = url, "Fetching");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.to_string(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_keeps_reason_phrase() {
        let err = FetchError::Status {
            status: reqwest::StatusCode::BAD_REQUEST.to_string(),
            body: "<error code=\"201\"/>".to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("HTTP 400 Bad Request"));
        assert!(text.to_lowercase().contains("bad request"));
    }

    #[test]
    fn test_new_with_default_config() {
        assert!(HttpFetcher::new(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_connection_error() {
        let fetcher = HttpFetcher::new(&HttpConfig {
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        // port 9 (discard) on localhost is not expected to be listening
        let result = fetcher.fetch("http://127.0.0.1:9/api?t=caps").await;
        assert!(matches!(
            result,
            Err(FetchError::Connection(_)) | Err(FetchError::Timeout)
        ));
    }
}
