use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

use super::ProviderFamily;
use crate::fetch::Fetcher;
use crate::provider::{Protocol, Provider, WishlistFormat};
use crate::searcher::xml::parse_items;
use crate::searcher::{SearchError, SearchRequest, SearchType, WishlistEntry};

static BOOK_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"tr[itemtype="http://schema.org/Book"]"#).unwrap());
static BOOK_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("a.bookTitle").unwrap());
static AUTHOR_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("a.authorName").unwrap());
static RESOURCE_ID: Lazy<Selector> = Lazy::new(|| Selector::parse("[data-resource-id]").unwrap());

/// Reading lists: books wanted rather than downloads.
pub struct WishlistFamily {
    fetcher: Arc<dyn Fetcher>,
}

impl WishlistFamily {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    async fn query_feed(&self, provider: &Provider) -> Result<Vec<WishlistEntry>, SearchError> {
        let body = self.fetcher.fetch(&provider.base_url()).await?;
        let items = parse_items(&body)?.into_items()?;

        let entries: Vec<_> = items
            .iter()
            .filter_map(|item| {
                let title = item.element("title")?;
                let author = item.element("author_name")?;
                Some(WishlistEntry {
                    provider: provider.name.clone(),
                    title: title.to_string(),
                    author: author.to_string(),
                    book_id: item.element("book_id").map(str::to_string),
                    isbn: item.element("isbn").map(str::to_string),
                    priority: provider.priority,
                })
            })
            .collect();

        debug!(
            provider = %provider.name,
            entries = items.len(),
            wanted = entries.len(),
            "Wishlist feed parsed"
        );
        Ok(entries)
    }

    /// Follow `?page=N` until a page has no entries or `max_pages` is reached.
    /// A failure after the first page keeps what was collected.
    async fn query_listopia(
        &self,
        provider: &Provider,
        max_pages: u32,
    ) -> Result<Vec<WishlistEntry>, SearchError> {
        let base = provider.base_url();
        let mut entries = Vec::new();
        let mut page = 1u32;

        loop {
            let url = if page == 1 {
                base.clone()
            } else {
                format!("{}?page={}", base, page)
            };

            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) if page == 1 => return Err(e.into()),
                Err(e) => {
                    warn!(
                        provider = %provider.name,
                        page = page,
                        error = %e,
                        "Failed to fetch wishlist page, keeping earlier pages"
                    );
                    break;
                }
            };

            let found = parse_listopia_page(&body, provider);
            debug!(provider = %provider.name, page = page, entries = found.len(), "Parsed wishlist page");
            if found.is_empty() {
                break;
            }
            entries.extend(found);

            if max_pages > 0 && page >= max_pages {
                warn!(
                    provider = %provider.name,
                    max_pages = max_pages,
                    "Maximum wishlist pages reached, more may be available"
                );
                break;
            }
            page += 1;
        }

        Ok(entries)
    }
}

fn parse_listopia_page(html: &str, provider: &Provider) -> Vec<WishlistEntry> {
    let document = Html::parse_document(html);

    document
        .select(&BOOK_ROW)
        .filter_map(|row| {
            let title_link = row.select(&BOOK_TITLE).next()?;
            let title = title_link
                .value()
                .attr("title")
                .map(str::to_string)
                .unwrap_or_else(|| title_link.text().collect::<String>())
                .trim()
                .to_string();
            let author = row
                .select(&AUTHOR_NAME)
                .next()?
                .text()
                .collect::<String>()
                .trim()
                .to_string();
            if title.is_empty() || author.is_empty() {
                return None;
            }
            let book_id = row
                .select(&RESOURCE_ID)
                .next()
                .and_then(|e| e.value().attr("data-resource-id"))
                .map(str::to_string);

            Some(WishlistEntry {
                provider: provider.name.clone(),
                title,
                author,
                book_id,
                isbn: None,
                priority: provider.priority,
            })
        })
        .collect()
}

#[async_trait]
impl ProviderFamily for WishlistFamily {
    type Item = WishlistEntry;

    fn name(&self) -> &'static str {
        "wishlist"
    }

    fn serves(&self, provider: &Provider) -> bool {
        matches!(provider.protocol, Protocol::Wishlist(_))
    }

    async fn query(
        &self,
        provider: &Provider,
        _request: &SearchRequest,
        _st: SearchType,
    ) -> Result<Option<Vec<WishlistEntry>>, SearchError> {
        let Protocol::Wishlist(settings) = &provider.protocol else {
            return Ok(None);
        };
        let entries = match settings.format {
            WishlistFormat::Feed => self.query_feed(provider).await?,
            WishlistFormat::Listopia => self.query_listopia(provider, settings.max_pages).await?,
        };
        Ok(Some(entries))
    }
}
