//! Aggregation rounds over every enabled provider of a family.
//!
//! Providers are queried one at a time, in configuration order. Shared
//! state is the injected provider store and the blocklist, both of which
//! serialize their own mutations, so concurrent rounds are safe.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::downgrade::maybe_disable_search_type;
use super::families::{
    DirectScrapeFamily, NewznabFamily, ProviderFamily, RssFamily, TorrentSiteFamily,
    WishlistFamily,
};
use super::{
    Aggregate, CapabilityCache, ResultRecord, SearchError, SearchRequest, SearchType,
    WishlistEntry,
};
use crate::blocklist::Blocklist;
use crate::config::SearchSettings;
use crate::fetch::Fetcher;
use crate::metrics::{PROVIDER_QUERIES, RESULTS_NORMALIZED};
use crate::provider::{Protocol, Provider, ProviderStore, StoreError};

/// Outcome of probing a single provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTestReport {
    pub provider: String,
    pub kind: &'static str,
    pub success: bool,
    /// Results returned by the test search.
    pub results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Queries configured providers and merges their results.
pub struct Aggregator {
    store: Arc<dyn ProviderStore>,
    blocklist: Arc<Blocklist>,
    newznab: NewznabFamily,
    torrent_sites: TorrentSiteFamily,
    direct_sites: DirectScrapeFamily,
    rss: RssFamily,
    wishlists: WishlistFamily,
}

impl Aggregator {
    pub fn new(
        settings: SearchSettings,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ProviderStore>,
        blocklist: Arc<Blocklist>,
    ) -> Self {
        let caps = CapabilityCache::new(fetcher.clone(), store.clone(), settings.cache_age_days);
        Self {
            newznab: NewznabFamily::new(fetcher.clone(), caps, settings.clone()),
            torrent_sites: TorrentSiteFamily::new(fetcher.clone(), settings.clone()),
            rss: RssFamily::new(fetcher.clone(), settings.clone()),
            direct_sites: DirectScrapeFamily::new(fetcher.clone(), settings),
            wishlists: WishlistFamily::new(fetcher),
            store,
            blocklist,
        }
    }

    pub fn blocklist(&self) -> &Arc<Blocklist> {
        &self.blocklist
    }

    pub fn store(&self) -> &Arc<dyn ProviderStore> {
        &self.store
    }

    /// Newznab and torznab indexers.
    pub async fn query_newznab(
        &self,
        request: &SearchRequest,
        st: SearchType,
    ) -> Aggregate<ResultRecord> {
        self.run_family(&self.newznab, request, st).await
    }

    pub async fn query_torrent_sites(
        &self,
        request: &SearchRequest,
        st: SearchType,
    ) -> Aggregate<ResultRecord> {
        self.run_family(&self.torrent_sites, request, st).await
    }

    pub async fn query_direct_sites(
        &self,
        request: &SearchRequest,
        st: SearchType,
    ) -> Aggregate<ResultRecord> {
        self.run_family(&self.direct_sites, request, st).await
    }

    /// Every entry of every RSS feed.
    pub async fn query_rss(&self) -> Aggregate<ResultRecord> {
        self.run_family(&self.rss, &SearchRequest::default(), SearchType::General)
            .await
    }

    pub async fn query_wishlists(&self) -> Aggregate<WishlistEntry> {
        self.run_family(&self.wishlists, &SearchRequest::default(), SearchType::Book)
            .await
    }

    /// Indexers, torrent sites and direct sites, in that order.
    pub async fn query_all(&self, request: &SearchRequest, st: SearchType) -> Aggregate<ResultRecord> {
        let mut aggregate = self.query_newznab(request, st).await;
        aggregate.merge(self.query_torrent_sites(request, st).await);
        aggregate.merge(self.query_direct_sites(request, st).await);
        aggregate
    }

    /// One round over `family`. Per-provider failures never escape: they
    /// become a downgrade or a blocklist entry and a log line.
    async fn run_family<F: ProviderFamily>(
        &self,
        family: &F,
        request: &SearchRequest,
        st: SearchType,
    ) -> Aggregate<F::Item> {
        let mut aggregate = Aggregate::default();
        let providers: Vec<Provider> = self
            .store
            .list()
            .await
            .into_iter()
            .filter(|p| p.enabled && family.serves(p))
            .collect();

        for provider in providers {
            if self.blocklist.is_blocked(&provider.name).await {
                debug!(provider = %provider.name, family = family.name(), "Provider is blocked");
                PROVIDER_QUERIES
                    .with_label_values(&[family.name(), "blocked"])
                    .inc();
                continue;
            }

            let mut provider = family.prepare(provider).await;
            match family.query(&provider, request, st).await {
                Ok(None) => {
                    debug!(
                        provider = %provider.name,
                        search_type = %st,
                        "Provider cannot serve this search"
                    );
                    PROVIDER_QUERIES
                        .with_label_values(&[family.name(), "skipped"])
                        .inc();
                }
                Ok(Some(items)) => {
                    aggregate.providers_queried += 1;
                    debug!(
                        provider = %provider.name,
                        family = family.name(),
                        results = items.len(),
                        "Provider returned results"
                    );
                    RESULTS_NORMALIZED
                        .with_label_values(&[family.name()])
                        .inc_by(items.len() as u64);
                    PROVIDER_QUERIES
                        .with_label_values(&[family.name(), "success"])
                        .inc();
                    aggregate.results.extend(items);
                }
                Err(e) if e.is_malformed() => {
                    aggregate.providers_queried += 1;
                    warn!(provider = %provider.name, error = %e, "Error parsing data from provider");
                    PROVIDER_QUERIES
                        .with_label_values(&[family.name(), "malformed"])
                        .inc();
                }
                Err(e) => {
                    aggregate.providers_queried += 1;
                    let reason = e.to_string();
                    error!(provider = %provider.name, error = %reason, "Error reading data from provider");
                    PROVIDER_QUERIES
                        .with_label_values(&[family.name(), "failure"])
                        .inc();

                    let downgraded =
                        maybe_disable_search_type(st, &reason, &mut provider, self.store.as_ref())
                            .await;
                    if !downgraded {
                        self.blocklist.block(&provider.name, &reason).await;
                    }
                }
            }
        }

        info!(
            family = family.name(),
            search_type = %st,
            providers = aggregate.providers_queried,
            results = aggregate.results.len(),
            "Aggregation round complete"
        );
        aggregate
    }

    /// Rediscover an indexer's capabilities regardless of their age.
    pub async fn refresh_capabilities(&self, name: &str) -> Result<Provider, SearchError> {
        let provider = self
            .store
            .get(name)
            .await
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if provider.indexer().is_none() {
            return Err(SearchError::Provider(format!(
                "{} is not a newznab or torznab provider",
                name
            )));
        }
        Ok(self
            .newznab
            .capabilities()
            .get_capabilities(provider, true)
            .await)
    }

    /// Probe one provider with a fixed request. The blocklist and stored
    /// capabilities are left alone apart from a normal capability refresh.
    pub async fn test_provider(&self, name: &str) -> Result<ProviderTestReport, SearchError> {
        let provider = self
            .store
            .get(name)
            .await
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let kind = provider.protocol.kind_name();
        let request = SearchRequest {
            term: "Agatha Christie".to_string(),
            ..SearchRequest::book("Agatha Christie", "Poirot")
        };

        let outcome = match &provider.protocol {
            Protocol::Newznab(_) | Protocol::Torznab(_) => {
                let provider = self.newznab.prepare(provider.clone()).await;
                let book = self.newznab.query(&provider, &request, SearchType::Book).await;
                let outcome = match book {
                    Ok(None) => {
                        self.newznab
                            .query(&provider, &request, SearchType::General)
                            .await
                    }
                    other => other,
                };
                outcome.map(|r| r.map(|items| items.len()))
            }
            Protocol::TorrentSite(_) => self
                .torrent_sites
                .query(&provider, &request, SearchType::General)
                .await
                .map(|r| r.map(|items| items.len())),
            Protocol::DirectScrape(_) => self
                .direct_sites
                .query(&provider, &request, SearchType::General)
                .await
                .map(|r| r.map(|items| items.len())),
            Protocol::Rss => self
                .rss
                .query(&provider, &request, SearchType::General)
                .await
                .map(|r| r.map(|items| items.len())),
            Protocol::Wishlist(_) => self
                .wishlists
                .query(&provider, &request, SearchType::Book)
                .await
                .map(|r| r.map(|items| items.len())),
        };

        let report = match outcome {
            Ok(Some(results)) => ProviderTestReport {
                provider: provider.name.clone(),
                kind,
                success: true,
                results,
                message: None,
            },
            Ok(None) => ProviderTestReport {
                provider: provider.name.clone(),
                kind,
                success: false,
                results: 0,
                message: Some("No usable search for this provider".to_string()),
            },
            Err(e) => ProviderTestReport {
                provider: provider.name.clone(),
                kind,
                success: false,
                results: 0,
                message: Some(e.to_string()),
            },
        };

        info!(
            provider = %report.provider,
            success = report.success,
            results = report.results,
            "Provider test complete"
        );
        Ok(report)
    }
}
