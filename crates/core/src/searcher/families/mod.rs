//! Protocol families.
//!
//! Each family knows how to query and normalize one kind of provider. The
//! aggregator only sees the [`ProviderFamily`] contract.

mod direct;
mod newznab;
mod rss;
mod torrent_site;
mod wishlist;

pub use direct::DirectScrapeFamily;
pub use newznab::NewznabFamily;
pub use rss::RssFamily;
pub use torrent_site::TorrentSiteFamily;
pub use wishlist::WishlistFamily;

use async_trait::async_trait;

use super::translator::search_terms;
use super::{SearchError, SearchRequest, SearchType};
use crate::provider::Provider;

/// One protocol family of providers.
#[async_trait]
pub trait ProviderFamily: Send + Sync {
    /// What one provider of this family returns.
    type Item: Send + 'static;

    /// Family name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Whether `provider` belongs to this family.
    fn serves(&self, provider: &Provider) -> bool;

    /// Bring the provider up to date before it is queried.
    async fn prepare(&self, provider: Provider) -> Provider {
        provider
    }

    /// Query one provider.
    ///
    /// `Ok(None)` means the provider cannot serve this request and was not
    /// contacted.
    async fn query(
        &self,
        provider: &Provider,
        request: &SearchRequest,
        st: SearchType,
    ) -> Result<Option<Vec<Self::Item>>, SearchError>;
}

/// Free-text term for sites without structured book search.
pub(crate) fn site_search_term(request: &SearchRequest, st: SearchType, postfix: &[String]) -> String {
    match st {
        SearchType::Magazine | SearchType::General => request.term.trim().to_string(),
        SearchType::ShortGeneral => request
            .term
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_string(),
        _ => {
            let (author, title) = search_terms(request, st, postfix);
            format!("{} {}", author, title).trim().to_string()
        }
    }
}

/// Expand a `{term}` search path against a provider's base URL.
pub(crate) fn search_url(provider: &Provider, search_path: &str, term: &str) -> String {
    let path = search_path.replace("{term}", &urlencoding::encode(term));
    if path.starts_with('/') {
        format!("{}{}", provider.base_url(), path)
    } else {
        format!("{}/{}", provider.base_url(), path)
    }
}
