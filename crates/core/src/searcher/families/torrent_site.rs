use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{search_url, site_search_term, ProviderFamily};
use crate::config::SearchSettings;
use crate::fetch::Fetcher;
use crate::provider::{Protocol, Provider};
use crate::searcher::normalize::{normalize_feed_item, NormalizeSettings};
use crate::searcher::xml::parse_items;
use crate::searcher::{ResultRecord, SearchError, SearchRequest, SearchType};

/// Torrent sites searched through an RSS endpoint.
pub struct TorrentSiteFamily {
    fetcher: Arc<dyn Fetcher>,
    settings: SearchSettings,
}

impl TorrentSiteFamily {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: SearchSettings) -> Self {
        Self { fetcher, settings }
    }
}

#[async_trait]
impl ProviderFamily for TorrentSiteFamily {
    type Item = ResultRecord;

    fn name(&self) -> &'static str {
        "torrent_site"
    }

    fn serves(&self, provider: &Provider) -> bool {
        matches!(provider.protocol, Protocol::TorrentSite(_))
    }

    async fn query(
        &self,
        provider: &Provider,
        request: &SearchRequest,
        st: SearchType,
    ) -> Result<Option<Vec<ResultRecord>>, SearchError> {
        let Protocol::TorrentSite(site) = &provider.protocol else {
            return Ok(None);
        };
        let term = site_search_term(request, st, &self.settings.name_postfix);
        if term.is_empty() {
            return Ok(None);
        }

        let url = search_url(provider, &site.search_path, &term);
        debug!(provider = %provider.name, url = %url, "Querying torrent site");
        let body = self.fetcher.fetch(&url).await?;
        let items = parse_items(&body)?.into_items()?;

        let normalize = NormalizeSettings::from(&self.settings);
        let records: Vec<_> = items
            .iter()
            .filter_map(|item| normalize_feed_item(item, provider, request.library, &normalize))
            .collect();

        debug!(
            provider = %provider.name,
            results = records.len(),
            term = %term,
            "Torrent site search complete"
        );
        Ok(Some(records))
    }
}
