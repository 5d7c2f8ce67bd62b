//! Configured search providers and their persisted store.

mod store;
mod types;

pub use store::{MemoryProviderStore, ProviderMutation, ProviderStore, StoreError, TomlProviderStore};
pub use types::*;

/// Normalize a configured host into a base URL: scheme added when missing,
/// trailing slash removed.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let with_scheme = if host.starts_with("http") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host_adds_scheme() {
        assert_eq!(normalize_host("indexer.example"), "http://indexer.example");
    }

    #[test]
    fn test_normalize_host_strips_trailing_slash() {
        assert_eq!(
            normalize_host("https://indexer.example/"),
            "https://indexer.example"
        );
    }

    #[test]
    fn test_normalize_host_keeps_path() {
        assert_eq!(
            normalize_host(" https://jackett.local:9117/api/v2.0/indexers/all/results/torznab/ "),
            "https://jackett.local:9117/api/v2.0/indexers/all/results/torznab"
        );
    }
}
