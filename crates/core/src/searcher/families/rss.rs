use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::ProviderFamily;
use crate::config::SearchSettings;
use crate::fetch::Fetcher;
use crate::provider::{Protocol, Provider};
use crate::searcher::normalize::{normalize_feed_item, NormalizeSettings};
use crate::searcher::xml::parse_items;
use crate::searcher::{ResultRecord, SearchError, SearchRequest, SearchType};

/// Plain RSS/Atom feeds. The whole feed is returned whatever the request.
pub struct RssFamily {
    fetcher: Arc<dyn Fetcher>,
    settings: SearchSettings,
}

impl RssFamily {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: SearchSettings) -> Self {
        Self { fetcher, settings }
    }
}

#[async_trait]
impl ProviderFamily for RssFamily {
    type Item = ResultRecord;

    fn name(&self) -> &'static str {
        "rss"
    }

    fn serves(&self, provider: &Provider) -> bool {
        provider.protocol == Protocol::Rss
    }

    async fn query(
        &self,
        provider: &Provider,
        request: &SearchRequest,
        _st: SearchType,
    ) -> Result<Option<Vec<ResultRecord>>, SearchError> {
        let body = self.fetcher.fetch(&provider.base_url()).await?;
        let items = parse_items(&body)?.into_items()?;

        let normalize = NormalizeSettings::from(&self.settings);
        let records: Vec<_> = items
            .iter()
            .filter_map(|item| normalize_feed_item(item, provider, request.library, &normalize))
            .collect();

        debug!(
            provider = %provider.name,
            entries = items.len(),
            results = records.len(),
            "RSS feed parsed"
        );
        Ok(Some(records))
    }
}
