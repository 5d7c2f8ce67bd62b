//! Testing utilities: a scriptable fetcher and provider/response fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use shelfscout_core::testing::{fixtures, MockFetcher};
//!
//! let fetcher = Arc::new(MockFetcher::new());
//! fetcher.respond("t=book", fixtures::NEWZNAB_ITEMS_XML).await;
//!
//! let store = Arc::new(MemoryProviderStore::new(vec![
//!     fixtures::book_indexer("geek", "indexer.example"),
//! ]));
//! // Use in an Aggregator...
//! ```

mod mock_fetcher;

pub use mock_fetcher::MockFetcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Local;

    use crate::provider::{
        CapabilitySet, DirectScrapeSettings, IndexerSettings, Protocol, Provider,
        TorrentSiteSettings, WishlistFormat, WishlistSettings,
    };

    fn provider(name: &str, host: &str, protocol: Protocol) -> Provider {
        Provider {
            name: name.to_string(),
            host: host.to_string(),
            enabled: true,
            priority: 0,
            protocol,
        }
    }

    /// Newznab indexer with default (general search only) capabilities,
    /// never discovered, api key `k3y`.
    pub fn newznab_provider(name: &str, host: &str) -> Provider {
        provider(
            name,
            host,
            Protocol::Newznab(IndexerSettings {
                api_key: Some("k3y".to_string()),
                manual: false,
                caps: CapabilitySet::default(),
            }),
        )
    }

    /// Newznab indexer with fresh capabilities: `t=book` on 7000/7020,
    /// magazines on 7010.
    pub fn book_indexer(name: &str, host: &str) -> Provider {
        let mut provider = newznab_provider(name, host);
        if let Some(settings) = provider.indexer_mut() {
            settings.caps = CapabilitySet {
                book_search: Some("book".to_string()),
                book_categories: vec!["7000".to_string(), "7020".to_string()],
                mag_categories: vec!["7010".to_string()],
                updated: Some(Local::now().date_naive()),
                ..Default::default()
            };
        }
        provider
    }

    /// Torznab indexer with fresh general-search capabilities.
    pub fn torznab_provider(name: &str, host: &str) -> Provider {
        provider(
            name,
            host,
            Protocol::Torznab(IndexerSettings {
                api_key: None,
                manual: false,
                caps: CapabilitySet {
                    updated: Some(Local::now().date_naive()),
                    ..Default::default()
                },
            }),
        )
    }

    pub fn rss_provider(name: &str, host: &str) -> Provider {
        provider(name, host, Protocol::Rss)
    }

    /// Torrent site searched at `/searchrss/{term}/`.
    pub fn torrent_site_provider(name: &str, host: &str) -> Provider {
        provider(
            name,
            host,
            Protocol::TorrentSite(TorrentSiteSettings {
                search_path: "/searchrss/{term}/".to_string(),
            }),
        )
    }

    /// Direct site searched at `/search.php?req={term}`.
    pub fn direct_provider(name: &str, host: &str) -> Provider {
        provider(
            name,
            host,
            Protocol::DirectScrape(DirectScrapeSettings {
                search_path: "/search.php?req={term}".to_string(),
            }),
        )
    }

    pub fn wishlist_provider(
        name: &str,
        host: &str,
        format: WishlistFormat,
        max_pages: u32,
    ) -> Provider {
        provider(
            name,
            host,
            Protocol::Wishlist(WishlistSettings { format, max_pages }),
        )
    }

    /// Capability document: books 7000 (Mags 7010, Ebook 7020), audio 3000
    /// (Audiobook 3030).
    pub const CAPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<caps>
  <server version="1.1" title="Test Indexer"/>
  <limits max="100" default="100"/>
  <searching>
    <search available="yes" supportedParams="q"/>
    <tv-search available="no"/>
  </searching>
  <categories>
    <category id="3000" name="Audio">
      <subcat id="3010" name="MP3"/>
      <subcat id="3030" name="Audiobook"/>
    </category>
    <category id="7000" name="Books">
      <subcat id="7010" name="Mags"/>
      <subcat id="7020" name="Ebook"/>
      <subcat id="7030" name="Comics"/>
    </category>
  </categories>
</caps>"#;

    /// Two results: one with size attribute and date, one bare.
    pub const NEWZNAB_ITEMS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/">
<channel>
  <title>Test Indexer</title>
  <link>http://indexer.example/</link>
  <item>
    <title>Tom Holt - Flying Dutch</title>
    <guid isPermaLink="true">http://indexer.example/details/1</guid>
    <link>http://indexer.example/getnzb/1.nzb</link>
    <pubDate>Mon, 10 Jun 2024 02:12:09 +0200</pubDate>
    <category>Books &gt; Ebook</category>
    <description>Tom Holt - Flying Dutch</description>
    <enclosure url="http://indexer.example/getnzb/1.nzb" length="1048576" type="application/x-nzb"/>
    <newznab:attr name="category" value="7020"/>
    <newznab:attr name="size" value="1048576"/>
  </item>
  <item>
    <title>Tom Holt - Flying Dutch (retail)</title>
    <link>http://indexer.example/getnzb/2.nzb</link>
  </item>
</channel>
</rss>"#;

    pub const ERROR_XML: &str =
        r#"<?xml version="1.0" encoding="UTF-8"?><error code="202" description="No such function"/>"#;

    /// Torrent feed: a torrent enclosure, a magnet-only entry and an entry
    /// with no link at all.
    pub const TORRENT_RSS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torrent="http://xmlns.ezrss.it/0.1/">
<channel>
  <title>Torrent Feed</title>
  <link>http://lime.example</link>
  <item>
    <title>Tom Holt - Flying Dutch [epub]</title>
    <pubDate>Sat, 01 Jun 2024 10:00:00 +0000</pubDate>
    <enclosure url="http://lime.example/dl/1.torrent" length="524288" type="application/x-bittorrent"/>
  </item>
  <item>
    <title>Tom Holt - Flying Dutch [mobi]</title>
    <torrent:magnetURI><![CDATA[magnet:?xt=urn:btih:0123456789abcdef&dn=flying]]></torrent:magnetURI>
  </item>
  <item>
    <title>Announcement</title>
  </item>
</channel>
</rss>"#;

    /// Shelf feed: one complete entry, one without an author.
    pub const WISHLIST_RSS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>to-read</title>
  <link>https://goodreads.example/review/list/1</link>
  <item>
    <title>The Colour of Magic</title>
    <book_id>34497</book_id>
    <author_name>Terry Pratchett</author_name>
    <isbn>0552124753</isbn>
  </item>
  <item>
    <title>Anonymous Pamphlet</title>
    <book_id>1</book_id>
  </item>
</channel>
</rss>"#;

    /// Search results table: one row with a mirror link, one with only a
    /// relative md5 link.
    pub const LIBGEN_HTML: &str = r#"<html><body>
<table class="c">
  <tr><td>ID</td><td>Author(s)</td><td>Title</td><td>Publisher</td><td>Year</td><td>Pages</td><td>Language</td><td>Size</td><td>Extension</td><td>Mirrors</td></tr>
  <tr>
    <td>101</td>
    <td><a href="search.php?req=Tom+Holt">Tom Holt</a></td>
    <td><a href="book/index.php?md5=AAA" title="">Flying Dutch<br><font color="green"><i>0356500659</i></font></a></td>
    <td>Orbit</td><td>1991</td><td>288</td><td>English</td>
    <td>2 Mb</td>
    <td>epub</td>
    <td><a href="http://mirror.example/get?md5=AAA">[1]</a></td>
  </tr>
  <tr>
    <td>102</td>
    <td>Tom Holt</td>
    <td><a href="book/index.php?md5=BBB">Ye Gods!</a></td>
  </tr>
</table>
</body></html>"#;

    /// One Listopia page with the given `(title, author, book_id)` rows.
    pub fn listopia_page(books: &[(&str, &str, &str)]) -> String {
        let rows: String = books
            .iter()
            .enumerate()
            .map(|(i, (title, author, id))| {
                format!(
                    r#"<tr itemscope itemtype="http://schema.org/Book">
  <td valign="top" class="number">{n}</td>
  <td><div class="u-anchorTarget" id="{id}"></div><div data-resource-id="{id}" data-resource-type="Book"></div></td>
  <td><a title="{title}" href="/book/show/{id}" class="bookTitle"><span itemprop="name">{title}</span></a><br>
    <span class="by">by</span> <span itemprop="author"><div class="authorName__container"><a class="authorName" itemprop="url" href="/author/show/1"><span itemprop="name">{author}</span></a></div></span></td>
</tr>"#,
                    n = i + 1,
                    id = id,
                    title = title,
                    author = author
                )
            })
            .collect();
        format!(
            r#"<html><body><table class="tableList js-dataTooltip">{}</table></body></html>"#,
            rows
        )
    }
}
