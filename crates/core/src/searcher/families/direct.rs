use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::debug;

use super::{search_url, site_search_term, ProviderFamily};
use crate::config::SearchSettings;
use crate::fetch::Fetcher;
use crate::provider::{Protocol, Provider};
use crate::searcher::normalize::parse_size;
use crate::searcher::{
    DownloadKind, Library, ResultRecord, SearchError, SearchRequest, SearchType,
};

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("table.c tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

// column positions in the results table
const AUTHOR_COL: usize = 1;
const TITLE_COL: usize = 2;
const SIZE_COL: usize = 7;
const EXTENSION_COL: usize = 8;
const MIRROR_COL: usize = 9;

/// Sites whose HTML search results table links straight to the files.
pub struct DirectScrapeFamily {
    fetcher: Arc<dyn Fetcher>,
    settings: SearchSettings,
}

impl DirectScrapeFamily {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: SearchSettings) -> Self {
        Self { fetcher, settings }
    }
}

#[async_trait]
impl ProviderFamily for DirectScrapeFamily {
    type Item = ResultRecord;

    fn name(&self) -> &'static str {
        "direct_scrape"
    }

    fn serves(&self, provider: &Provider) -> bool {
        matches!(provider.protocol, Protocol::DirectScrape(_))
    }

    async fn query(
        &self,
        provider: &Provider,
        request: &SearchRequest,
        st: SearchType,
    ) -> Result<Option<Vec<ResultRecord>>, SearchError> {
        let Protocol::DirectScrape(site) = &provider.protocol else {
            return Ok(None);
        };
        let term = site_search_term(request, st, &self.settings.name_postfix);
        if term.is_empty() {
            return Ok(None);
        }

        let url = search_url(provider, &site.search_path, &term);
        debug!(provider = %provider.name, url = %url, "Querying direct site");
        let body = self.fetcher.fetch(&url).await?;

        let records = parse_results_table(&body, provider, request.library, &self.settings);
        debug!(
            provider = %provider.name,
            results = records.len(),
            term = %term,
            "Direct site search complete"
        );
        Ok(Some(records))
    }
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Resolve a possibly relative href against the provider.
fn absolutize(provider: &Provider, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", provider.base_url(), href)
    } else {
        format!("{}/{}", provider.base_url(), href)
    }
}

/// Rows without a title link to an `md5=` page are skipped.
fn parse_results_table(
    html: &str,
    provider: &Provider,
    library: Library,
    settings: &SearchSettings,
) -> Vec<ResultRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for row in document.select(&ROW) {
        let cells: Vec<_> = row.select(&CELL).collect();
        let Some(title_cell) = cells.get(TITLE_COL) else {
            continue;
        };
        let Some(title_link) = title_cell
            .select(&LINK)
            .find(|a| a.value().attr("href").is_some_and(|h| h.contains("md5=")))
        else {
            continue;
        };

        let title = title_link
            .text()
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if title.is_empty() {
            continue;
        }
        let author = cells.get(AUTHOR_COL).map(cell_text).unwrap_or_default();
        let extension = cells.get(EXTENSION_COL).map(cell_text).unwrap_or_default();

        let href = cells
            .get(MIRROR_COL)
            .and_then(|c| c.select(&LINK).next())
            .or(Some(title_link))
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default();

        let full_title = match (author.is_empty(), extension.is_empty()) {
            (false, false) => format!("{} - {}.{}", author, title, extension),
            (false, true) => format!("{} - {}", author, title),
            (true, false) => format!("{}.{}", title, extension),
            (true, true) => title,
        };

        records.push(ResultRecord {
            provider: provider.name.clone(),
            title: full_title,
            url: absolutize(provider, href),
            kind: DownloadKind::Direct,
            size_bytes: cells
                .get(SIZE_COL)
                .and_then(|c| parse_size(&cell_text(c)))
                .unwrap_or(settings.default_size),
            date: settings.default_date.clone(),
            priority: provider.priority,
            book_id: None,
            library,
        });
    }

    records
}
