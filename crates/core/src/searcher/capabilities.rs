//! Capability discovery and caching for newznab/torznab indexers.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};

use super::xml::{parse_caps, CapsDocument};
use super::SearchError;
use crate::fetch::Fetcher;
use crate::metrics::CAPABILITY_REFRESHES;
use crate::provider::{CapabilitySet, Provider, ProviderStore};

/// Returns providers with a capability set that can be trusted.
pub struct CapabilityCache {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ProviderStore>,
    cache_age_days: u32,
}

impl CapabilityCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn ProviderStore>, cache_age_days: u32) -> Self {
        Self {
            fetcher,
            store,
            cache_age_days,
        }
    }

    /// Return `provider` with fresh capabilities, discovering them if needed.
    ///
    /// Discovery failures keep the previous values; the provider stays usable.
    pub async fn get_capabilities(&self, provider: Provider, force: bool) -> Provider {
        self.get_capabilities_on(provider, force, Local::now().date_naive())
            .await
    }

    pub async fn get_capabilities_on(
        &self,
        mut provider: Provider,
        force: bool,
        today: NaiveDate,
    ) -> Provider {
        let Some(settings) = provider.indexer() else {
            return provider;
        };

        if !force && self.is_trusted(settings.manual, &settings.caps, today) {
            debug!(provider = %provider.name, "Using stored capabilities");
            return provider;
        }

        match self.discover(&provider).await {
            Ok(doc) => {
                let caps = apply_caps(&settings.caps, &doc, today);
                debug!(
                    provider = %provider.name,
                    books = %caps.book_categories.join(","),
                    mags = %caps.mag_categories.join(","),
                    audio = %caps.audio_categories.join(","),
                    "Capabilities discovered"
                );

                let stored = caps.clone();
                let result = self
                    .store
                    .update(
                        &provider.name,
                        Box::new(move |p: &mut Provider| {
                            if let Some(s) = p.indexer_mut() {
                                s.caps = stored;
                            }
                        }),
                    )
                    .await;
                if let Err(e) = result {
                    warn!(provider = %provider.name, error = %e, "Failed to persist capabilities");
                }

                if let Some(s) = provider.indexer_mut() {
                    s.caps = caps;
                }
                CAPABILITY_REFRESHES.with_label_values(&["success"]).inc();
            }
            Err(e) => {
                warn!(
                    provider = %provider.name,
                    error = %e,
                    "Unable to get capabilities, keeping stored values"
                );
                CAPABILITY_REFRESHES.with_label_values(&["failure"]).inc();
            }
        }

        provider
    }

    /// Stored values are used as-is when present and either pinned by hand
    /// or younger than the cache age.
    fn is_trusted(&self, manual: bool, caps: &CapabilitySet, today: NaiveDate) -> bool {
        if !caps.has_stored_values() {
            return false;
        }
        if manual {
            return true;
        }
        match caps.age_days(today) {
            Some(age) if age <= self.cache_age_days as i64 => true,
            _ => {
                debug!("Stored capabilities are too old");
                false
            }
        }
    }

    /// Fetch and parse `t=caps`, retrying once with the API key.
    async fn discover(&self, provider: &Provider) -> Result<CapsDocument, SearchError> {
        let url = format!("{}/api?t=caps", provider.base_url());
        debug!(provider = %provider.name, "Requesting capabilities");

        let body = match self.fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(first) => match provider.api_key() {
                Some(key) => {
                    debug!(provider = %provider.name, "Retrying capabilities with api key");
                    let url = format!("{}&apikey={}", url, urlencoding::encode(key));
                    self.fetcher.fetch(&url).await?
                }
                None => return Err(first.into()),
            },
        };

        parse_caps(&body)
    }
}

/// Derive a capability set from a caps document.
///
/// Dedicated magazine verbs are never advertised, so `previous.mag_search`
/// is carried over.
pub fn apply_caps(previous: &CapabilitySet, doc: &CapsDocument, today: NaiveDate) -> CapabilitySet {
    let mut caps = CapabilitySet {
        general_search: match doc.search_available {
            Some(false) => None,
            _ => Some("search".to_string()),
        },
        mag_search: previous.mag_search.clone(),
        extended: true,
        updated: Some(today),
        ..Default::default()
    };

    for cat in &doc.categories {
        match cat.name.to_lowercase().as_str() {
            "audio" => {
                caps.audio_categories = vec![cat.id.clone()];
                caps.audio_categories.extend(
                    cat.subcats
                        .iter()
                        .filter(|s| s.name.to_lowercase().contains("audiobook"))
                        .map(|s| s.id.clone()),
                );
                caps.audio_search = match doc.audio_search_available {
                    Some(true) => Some("audio".to_string()),
                    _ => None,
                };
            }
            "books" => {
                caps.book_categories = vec![cat.id.clone()];
                caps.mag_categories.clear();

                // newznab+ uses 7000 and supports t=book, nZEDb uses 8000 and does not
                let mut book_verb = cat.id == "7000";
                if let Some(available) = doc.book_search_available {
                    book_verb = available;
                }
                caps.book_search = book_verb.then(|| "book".to_string());

                for sub in &cat.subcats {
                    let name = sub.name.to_lowercase();
                    if name.contains("ebook") {
                        caps.book_categories.push(sub.id.clone());
                    }
                    if name.contains("mag") {
                        caps.mag_categories.push(sub.id.clone());
                    }
                }
                if caps.mag_categories.is_empty() {
                    caps.mag_categories.push(cat.id.clone());
                }
            }
            _ => {}
        }
    }

    caps
}
