//! Provider records and the per-protocol settings they carry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A configured remote search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    /// Unique name, also the blocklist key.
    pub name: String,
    /// Host or base URL.
    pub host: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Priority copied onto every result from this provider.
    #[serde(default)]
    pub priority: i32,
    /// Protocol family and its family-specific settings.
    #[serde(flatten)]
    pub protocol: Protocol,
}

fn default_enabled() -> bool {
    true
}

/// Closed set of protocol families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Protocol {
    /// Usenet indexer speaking the newznab API.
    Newznab(IndexerSettings),
    /// Torrent indexer speaking the torznab API (newznab-compatible).
    Torznab(IndexerSettings),
    /// Plain RSS/Atom feed of download links.
    Rss,
    /// Reading list whose entries are books wanted, not downloads.
    Wishlist(WishlistSettings),
    /// Torrent site exposing an RSS search endpoint.
    TorrentSite(TorrentSiteSettings),
    /// Site whose HTML search results link directly to files.
    DirectScrape(DirectScrapeSettings),
}

impl Protocol {
    /// Stable name used in logs, metrics and the config file.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Protocol::Newznab(_) => "newznab",
            Protocol::Torznab(_) => "torznab",
            Protocol::Rss => "rss",
            Protocol::Wishlist(_) => "wishlist",
            Protocol::TorrentSite(_) => "torrent_site",
            Protocol::DirectScrape(_) => "direct_scrape",
        }
    }
}

/// Settings shared by newznab and torznab indexers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Capabilities were set by hand; stale values are not rediscovered.
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub caps: CapabilitySet,
}

/// What an indexer endpoint accepts.
///
/// Verbs are the values sent as `t=` (`search`, `book`, `audio`, ...);
/// categories are the endpoint's own category ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag_search: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub book_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audio_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mag_categories: Vec<String>,
    #[serde(default = "default_extended")]
    pub extended: bool,
    /// Date of the last successful discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<NaiveDate>,
}

fn default_extended() -> bool {
    true
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self {
            general_search: Some("search".to_string()),
            book_search: None,
            audio_search: None,
            mag_search: None,
            book_categories: Vec::new(),
            audio_categories: Vec::new(),
            mag_categories: Vec::new(),
            extended: default_extended(),
            updated: None,
        }
    }
}

/// A dedicated search verb that can be withdrawn after a protocol rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityVerb {
    Book,
    Audio,
}

impl CapabilityVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityVerb::Book => "book_search",
            CapabilityVerb::Audio => "audio_search",
        }
    }
}

impl CapabilitySet {
    /// Whether discovery ever succeeded (or values were entered by hand).
    pub fn has_stored_values(&self) -> bool {
        self.updated.is_some()
    }

    /// Days since the last discovery, if any.
    pub fn age_days(&self, today: NaiveDate) -> Option<i64> {
        self.updated.map(|d| (today - d).num_days())
    }

    pub fn verb(&self, verb: CapabilityVerb) -> Option<&str> {
        match verb {
            CapabilityVerb::Book => self.book_search.as_deref(),
            CapabilityVerb::Audio => self.audio_search.as_deref(),
        }
        .filter(|v| !v.is_empty())
    }

    pub fn clear_verb(&mut self, verb: CapabilityVerb) {
        match verb {
            CapabilityVerb::Book => self.book_search = None,
            CapabilityVerb::Audio => self.audio_search = None,
        }
    }
}

/// Wishlist page format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistFormat {
    /// RSS shelf with `book_id`/`author_name`/`isbn` item fields.
    #[default]
    Feed,
    /// Paged HTML list.
    Listopia,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WishlistSettings {
    #[serde(default)]
    pub format: WishlistFormat,
    /// Page limit for paged lists; zero means follow pages until one is empty.
    #[serde(default)]
    pub max_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentSiteSettings {
    /// Path appended to the host, `{term}` replaced by the encoded search term.
    pub search_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectScrapeSettings {
    /// Path appended to the host, `{term}` replaced by the encoded search term.
    pub search_path: String,
}

impl Provider {
    /// Indexer settings, for newznab/torznab providers only.
    pub fn indexer(&self) -> Option<&IndexerSettings> {
        match &self.protocol {
            Protocol::Newznab(settings) | Protocol::Torznab(settings) => Some(settings),
            _ => None,
        }
    }

    pub fn indexer_mut(&mut self) -> Option<&mut IndexerSettings> {
        match &mut self.protocol {
            Protocol::Newznab(settings) | Protocol::Torznab(settings) => Some(settings),
            _ => None,
        }
    }

    pub fn caps(&self) -> Option<&CapabilitySet> {
        self.indexer().map(|s| &s.caps)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.indexer()
            .and_then(|s| s.api_key.as_deref())
            .filter(|k| !k.is_empty())
    }

    /// Base URL of the provider.
    pub fn base_url(&self) -> String {
        super::normalize_host(&self.host)
    }

    /// Copy with the API key masked, for display.
    pub fn redacted(&self) -> Provider {
        let mut copy = self.clone();
        if let Some(settings) = copy.indexer_mut() {
            if settings.api_key.is_some() {
                settings.api_key = Some("********".to_string());
            }
        }
        copy
    }
}
