pub mod blocklist;
pub mod config;
pub mod fetch;
pub mod metrics;
pub mod provider;
pub mod searcher;
pub mod testing;

pub use blocklist::{Blocklist, BlocklistEntry};
pub use config::{
    load_config, load_config_from_str, validate_config, validate_providers, Config, ConfigError,
    SanitizedConfig, SearchSettings,
};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use provider::{
    CapabilitySet, MemoryProviderStore, Protocol, Provider, ProviderStore, StoreError,
    TomlProviderStore,
};
pub use searcher::{
    Aggregate, Aggregator, DownloadKind, Library, ProviderTestReport, ResultRecord, SearchError,
    SearchRequest, SearchType, WishlistEntry,
};
