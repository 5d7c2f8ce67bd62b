use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tracing::debug;

use super::ProviderFamily;
use crate::config::SearchSettings;
use crate::fetch::Fetcher;
use crate::metrics::RESULTS_AGED_OUT;
use crate::provider::{Protocol, Provider};
use crate::searcher::capabilities::CapabilityCache;
use crate::searcher::normalize::{
    normalize_indexer_item, within_retention, IndexerMode, NormalizeSettings,
};
use crate::searcher::translator::build_query;
use crate::searcher::xml::parse_items;
use crate::searcher::{ResultRecord, SearchError, SearchRequest, SearchType};

/// Newznab and torznab indexers.
pub struct NewznabFamily {
    fetcher: Arc<dyn Fetcher>,
    caps: CapabilityCache,
    settings: SearchSettings,
}

impl NewznabFamily {
    pub fn new(fetcher: Arc<dyn Fetcher>, caps: CapabilityCache, settings: SearchSettings) -> Self {
        Self {
            fetcher,
            caps,
            settings,
        }
    }

    pub fn capabilities(&self) -> &CapabilityCache {
        &self.caps
    }
}

#[async_trait]
impl ProviderFamily for NewznabFamily {
    type Item = ResultRecord;

    fn name(&self) -> &'static str {
        "newznab"
    }

    fn serves(&self, provider: &Provider) -> bool {
        provider.indexer().is_some()
    }

    async fn prepare(&self, provider: Provider) -> Provider {
        self.caps.get_capabilities(provider, false).await
    }

    async fn query(
        &self,
        provider: &Provider,
        request: &SearchRequest,
        st: SearchType,
    ) -> Result<Option<Vec<ResultRecord>>, SearchError> {
        let Some(query) = build_query(provider, request, st, &self.settings.name_postfix) else {
            return Ok(None);
        };
        let mode = match provider.protocol {
            Protocol::Torznab(_) => IndexerMode::Torznab,
            _ => IndexerMode::Nzb,
        };

        let url = query.to_url(&provider.base_url());
        debug!(provider = %provider.name, url = %url, "Querying indexer");
        let body = self.fetcher.fetch(&url).await?;
        let items = parse_items(&body)?.into_items()?;

        let normalize = NormalizeSettings::from(&self.settings);
        let today = Local::now().date_naive();
        let retention = self.settings.usenet_retention_days;

        let mut records = Vec::new();
        for item in &items {
            let Some(record) = normalize_indexer_item(item, provider, mode, request, &normalize)
            else {
                continue;
            };
            if within_retention(&record, retention, &normalize.default_date, today) {
                records.push(record);
            } else {
                RESULTS_AGED_OUT.inc();
            }
        }

        debug!(
            provider = %provider.name,
            items = items.len(),
            results = records.len(),
            "Indexer search complete"
        );
        Ok(Some(records))
    }
}
