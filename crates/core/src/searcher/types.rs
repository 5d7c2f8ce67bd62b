//! Types shared by the translator, normalizer, families and aggregator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchError;
use crate::provider::{CapabilityVerb, StoreError};

/// Logical category of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Book,
    /// Book search with the title cut at the first parenthesis.
    ShortBook,
    Audio,
    ShortAudio,
    #[serde(alias = "mag")]
    Magazine,
    General,
    ShortGeneral,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Book => "book",
            SearchType::ShortBook => "short_book",
            SearchType::Audio => "audio",
            SearchType::ShortAudio => "short_audio",
            SearchType::Magazine => "magazine",
            SearchType::General => "general",
            SearchType::ShortGeneral => "short_general",
        }
    }

    /// Whether titles are truncated at the first parenthesis.
    pub fn is_short(&self) -> bool {
        matches!(
            self,
            SearchType::ShortBook | SearchType::ShortAudio | SearchType::ShortGeneral
        )
    }

    /// The dedicated indexer verb this search type uses, if any.
    pub fn dedicated_verb(&self) -> Option<CapabilityVerb> {
        match self {
            SearchType::Book | SearchType::ShortBook => Some(CapabilityVerb::Book),
            SearchType::Audio | SearchType::ShortAudio => Some(CapabilityVerb::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media library the request is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Library {
    #[default]
    Ebook,
    AudioBook,
    Magazine,
}

/// One logical query, built per user action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Book the results are for, copied onto indexer results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Free-text term for magazine and general searches.
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub library: Library,
}

impl SearchRequest {
    pub fn book(author: &str, title: &str) -> Self {
        Self {
            author: author.to_string(),
            title: title.to_string(),
            term: format!("{} {}", author, title),
            ..Default::default()
        }
    }

    pub fn term(term: &str) -> Self {
        Self {
            term: term.to_string(),
            ..Default::default()
        }
    }

    pub fn with_book_id(mut self, book_id: &str) -> Self {
        self.book_id = Some(book_id.to_string());
        self
    }
}

/// How a result's locator is downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    Nzb,
    Torrent,
    Magnet,
    /// Plain link to the file itself.
    Direct,
}

impl DownloadKind {
    /// Kind implied by a URL; used when the protocol does not say.
    pub fn guess(url: &str, fallback: DownloadKind) -> DownloadKind {
        if url.starts_with("magnet:") {
            DownloadKind::Magnet
        } else {
            fallback
        }
    }
}

/// Canonical normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Name of the provider that returned it.
    pub provider: String,
    pub title: String,
    pub url: String,
    pub kind: DownloadKind,
    /// Size in bytes, or the configured default when unknown.
    pub size_bytes: u64,
    /// RFC 2822 date as sent by the provider, or the configured default.
    pub date: String,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    /// Library of the request that produced it.
    #[serde(default)]
    pub library: Library,
}

/// A book wanted, as listed on a wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub provider: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub priority: i32,
}

/// Results of one aggregation round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate<T> {
    pub results: Vec<T>,
    /// Providers actually contacted, whether or not they returned anything.
    pub providers_queried: usize,
}

impl<T> Default for Aggregate<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            providers_queried: 0,
        }
    }
}

impl<T> Aggregate<T> {
    /// Append another round's results and count.
    pub fn merge(&mut self, other: Aggregate<T>) {
        self.results.extend(other.results);
        self.providers_queried += other.providers_queried;
    }
}

/// Per-provider failure, classified by the aggregator.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The provider answered with an error document.
    #[error("{0}")]
    Provider(String),

    /// The response could not be parsed.
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SearchError {
    /// Failures that say nothing about the provider's health.
    pub fn is_malformed(&self) -> bool {
        matches!(self, SearchError::Malformed(_))
    }
}
