use std::sync::Arc;

use shelfscout_core::{Aggregator, Blocklist, Config, ProviderStore, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(config: Config, aggregator: Arc<Aggregator>) -> Self {
        Self { config, aggregator }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn aggregator(&self) -> &Aggregator {
        self.aggregator.as_ref()
    }

    pub fn store(&self) -> &dyn ProviderStore {
        self.aggregator.store().as_ref()
    }

    pub fn blocklist(&self) -> &Blocklist {
        self.aggregator.blocklist().as_ref()
    }
}
