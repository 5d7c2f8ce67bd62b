//! Result normalization: protocol items to [`ResultRecord`]s.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use super::xml::RawItem;
use super::{DownloadKind, Library, ResultRecord, SearchRequest};
use crate::config::SearchSettings;
use crate::provider::Provider;

/// Which indexer protocol an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerMode {
    Nzb,
    Torznab,
}

/// Settings the normalizer reads.
#[derive(Debug, Clone)]
pub struct NormalizeSettings {
    pub prefer_magnet: bool,
    pub default_size: u64,
    pub default_date: String,
}

impl From<&SearchSettings> for NormalizeSettings {
    fn from(s: &SearchSettings) -> Self {
        Self {
            prefer_magnet: s.prefer_magnet,
            default_size: s.default_size,
            default_date: s.default_date.clone(),
        }
    }
}

static SIZE_WITH_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*([A-Za-z]*)$").unwrap());

/// Parse a size field: plain bytes, or a number with a unit ("5.2 MB", "700KiB").
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim().replace(',', "");
    if let Ok(bytes) = text.parse::<u64>() {
        return Some(bytes);
    }

    let caps = SIZE_WITH_UNIT.captures(&text)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
    let multiplier: f64 = match unit.as_str() {
        "" | "b" | "bytes" => 1.0,
        "k" | "kb" | "kib" => 1024.0,
        "m" | "mb" | "mib" => 1024.0 * 1024.0,
        "g" | "gb" | "gib" => 1024.0 * 1024.0 * 1024.0,
        "t" | "tb" | "tib" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((number * multiplier) as u64)
}

/// Normalize one newznab/torznab `<item>`.
///
/// Returns `None` for items with no download URL. The book id and library
/// are copied from `request`.
pub fn normalize_indexer_item(
    item: &RawItem,
    provider: &Provider,
    mode: IndexerMode,
    request: &SearchRequest,
    settings: &NormalizeSettings,
) -> Option<ResultRecord> {
    let title = item.element("title").unwrap_or_default().to_string();
    let size = item
        .element("size")
        .or_else(|| item.attr("size"))
        .and_then(parse_size);
    let link = item
        .element("link")
        .map(str::to_string)
        .or_else(|| item.links().next().map(|(href, _, _)| href.to_string()));
    let magnet = item.attr("magneturl").map(str::to_string);

    let url = match (link, magnet) {
        (Some(_), Some(magnet)) if settings.prefer_magnet => magnet,
        (Some(link), _) => link,
        (None, Some(magnet)) => magnet,
        (None, None) => {
            debug!(provider = %provider.name, title = %title, "Item has no download url");
            return None;
        }
    };

    let kind = match mode {
        IndexerMode::Nzb => DownloadKind::Nzb,
        IndexerMode::Torznab => DownloadKind::guess(&url, DownloadKind::Torrent),
    };

    Some(ResultRecord {
        provider: provider.name.clone(),
        title,
        url,
        kind,
        size_bytes: size.unwrap_or(settings.default_size),
        date: item
            .element("pubdate")
            .map(str::to_string)
            .unwrap_or_else(|| settings.default_date.clone()),
        priority: provider.priority,
        book_id: request.book_id.clone(),
        library: request.library,
    })
}

/// Normalize one RSS/Atom entry.
///
/// A title and a resolvable URL are required. Link precedence: nzb, then
/// torrent or magnet (magnet only first when preferred), then the bare link.
pub fn normalize_feed_item(
    item: &RawItem,
    provider: &Provider,
    library: Library,
    settings: &NormalizeSettings,
) -> Option<ResultRecord> {
    let title = item.element("title")?.to_string();

    let mut torrent = None;
    let mut nzb = None;
    let mut size = None;
    for (href, media_type, length) in item.links() {
        let media_type = media_type.unwrap_or_default();
        if media_type.contains("x-bittorrent") {
            torrent = Some(href.to_string());
        } else if media_type.contains("x-nzb") {
            nzb = Some(href.to_string());
        } else {
            continue;
        }
        size = length.and_then(parse_size);
        break;
    }

    let magnet = item
        .element("magneturi")
        .or_else(|| item.attr("magneturl"))
        .map(str::to_string);

    let (url, kind) = if let Some(nzb) = nzb {
        (nzb, DownloadKind::Nzb)
    } else {
        match (torrent, magnet) {
            (Some(_), Some(magnet)) if settings.prefer_magnet => (magnet, DownloadKind::Magnet),
            (Some(torrent), _) => (torrent, DownloadKind::Torrent),
            (None, Some(magnet)) => (magnet, DownloadKind::Magnet),
            (None, None) => {
                let link = item
                    .element("link")
                    .map(str::to_string)
                    .or_else(|| item.links().next().map(|(href, _, _)| href.to_string()))?;
                let kind = DownloadKind::guess(&link, DownloadKind::Direct);
                (link, kind)
            }
        }
    };

    let size = size
        .or_else(|| item.attr("size").and_then(parse_size))
        .unwrap_or(settings.default_size);

    let date = item
        .attr("usenetdate")
        .or_else(|| item.element("pubdate"))
        .map(str::to_string)
        .unwrap_or_else(|| settings.default_date.clone());

    Some(ResultRecord {
        provider: provider.name.clone(),
        title,
        url,
        kind,
        size_bytes: size,
        date,
        priority: provider.priority,
        book_id: None,
        library,
    })
}

/// Age in whole days of an RFC 2822 style date ("Mon, 27 May 2013 02:12:09 +0200").
///
/// The zone is ignored and only the calendar date counts. A leading weekday
/// is skipped without being checked against the date. Unparsable dates have
/// age zero.
pub fn age_in_days(date: &str, today: NaiveDate) -> i64 {
    let mut tokens = date.split_whitespace().peekable();
    if tokens.peek().is_some_and(|t| t.ends_with(',')) {
        tokens.next();
    }
    let stripped = tokens.take(4).collect::<Vec<_>>().join(" ");
    match NaiveDateTime::parse_from_str(&stripped, "%d %b %Y %H:%M:%S") {
        Ok(dt) => (today - dt.date()).num_days(),
        Err(e) => {
            debug!(date = %date, error = %e, "Unable to get age");
            0
        }
    }
}

/// Whether a result is inside the retention window. Zero disables filtering.
///
/// Records carrying `default_date` had no date of their own and are always kept.
pub fn within_retention(
    record: &ResultRecord,
    retention_days: u32,
    default_date: &str,
    today: NaiveDate,
) -> bool {
    if retention_days == 0 || record.date == default_date {
        return true;
    }
    let age = age_in_days(&record.date, today);
    if age <= retention_days as i64 {
        true
    } else {
        debug!(title = %record.title, age = age, "Result is too old");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::xml::parse_items;
    use crate::testing::fixtures;

    fn settings(prefer_magnet: bool) -> NormalizeSettings {
        NormalizeSettings {
            prefer_magnet,
            default_size: 1000,
            default_date: "Fri, 01 Jan 1970 00:00:00 +0100".to_string(),
        }
    }

    fn book_request() -> SearchRequest {
        SearchRequest {
            library: Library::AudioBook,
            ..SearchRequest::book("Tom Holt", "Flying Dutch").with_book_id("b1")
        }
    }

    fn first_item(xml: &str) -> RawItem {
        parse_items(xml).unwrap().items.remove(0)
    }

    fn rss(item_body: &str) -> String {
        format!(
            r#"<rss xmlns:torrent="http://xmlns.ezrss.it/0.1/" xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/"><channel><item>{}</item></channel></rss>"#,
            item_body
        )
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("123456"), Some(123456));
        assert_eq!(parse_size("1,024"), Some(1024));
        assert_eq!(parse_size("5 MB"), Some(5 * 1024 * 1024));
        assert_eq!(parse_size("1.5 KiB"), Some(1536));
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("5 parsecs"), None);
    }

    #[test]
    fn test_indexer_item_fields() {
        let provider = fixtures::newznab_provider("geek", "indexer.example");
        let item = first_item(fixtures::NEWZNAB_ITEMS_XML);
        let record = normalize_indexer_item(
            &item,
            &provider,
            IndexerMode::Nzb,
            &book_request(),
            &settings(false),
        )
        .unwrap();

        assert_eq!(record.provider, "geek");
        assert_eq!(record.title, "Tom Holt - Flying Dutch");
        assert_eq!(record.url, "http://indexer.example/getnzb/1.nzb");
        assert_eq!(record.kind, DownloadKind::Nzb);
        assert_eq!(record.size_bytes, 1048576);
        assert_eq!(record.date, "Mon, 10 Jun 2024 02:12:09 +0200");
        assert_eq!(record.book_id.as_deref(), Some("b1"));
        assert_eq!(record.library, Library::AudioBook);
    }

    #[test]
    fn test_indexer_item_defaults() {
        let provider = fixtures::newznab_provider("geek", "indexer.example");
        let item = first_item(&rss("<title>Bare</title><link>http://x/1.nzb</link>"));
        let record = normalize_indexer_item(
            &item,
            &provider,
            IndexerMode::Nzb,
            &SearchRequest::default(),
            &settings(false),
        )
        .unwrap();
        assert_eq!(record.size_bytes, 1000);
        assert_eq!(record.date, "Fri, 01 Jan 1970 00:00:00 +0100");
        assert_eq!(record.library, Library::Ebook);
    }

    #[test]
    fn test_indexer_item_magnet_preference() {
        let provider = fixtures::newznab_provider("jackett", "localhost:9117");
        let body = rss(
            r#"<title>T</title><link>http://j/dl/1.torrent</link>
               <newznab:attr name="magneturl" value="magnet:?xt=urn:btih:aa"/>"#,
        );
        let item = first_item(&body);

        let record = normalize_indexer_item(
            &item,
            &provider,
            IndexerMode::Torznab,
            &SearchRequest::default(),
            &settings(false),
        )
        .unwrap();
        assert_eq!(record.url, "http://j/dl/1.torrent");
        assert_eq!(record.kind, DownloadKind::Torrent);

        let record = normalize_indexer_item(
            &item,
            &provider,
            IndexerMode::Torznab,
            &SearchRequest::default(),
            &settings(true),
        )
        .unwrap();
        assert_eq!(record.url, "magnet:?xt=urn:btih:aa");
        assert_eq!(record.kind, DownloadKind::Magnet);
    }

    #[test]
    fn test_indexer_item_without_url_is_dropped() {
        let provider = fixtures::newznab_provider("geek", "indexer.example");
        let item = first_item(&rss("<title>No link</title>"));
        assert!(normalize_indexer_item(
            &item,
            &provider,
            IndexerMode::Nzb,
            &SearchRequest::default(),
            &settings(false)
        )
        .is_none());
    }

    #[test]
    fn test_feed_item_magnet_only_gets_defaults() {
        let provider = fixtures::rss_provider("feed", "feeds.example/books.rss");
        let item = first_item(&rss(
            "<title>Magnet Only</title><torrent:magnetURI>magnet:?xt=urn:btih:bb</torrent:magnetURI>",
        ));
        let record =
            normalize_feed_item(&item, &provider, Library::Ebook, &settings(false)).unwrap();
        assert_eq!(record.url, "magnet:?xt=urn:btih:bb");
        assert_eq!(record.kind, DownloadKind::Magnet);
        assert_eq!(record.size_bytes, 1000);
        assert_eq!(record.date, "Fri, 01 Jan 1970 00:00:00 +0100");
    }

    #[test]
    fn test_feed_item_torrent_vs_magnet() {
        let provider = fixtures::rss_provider("feed", "feeds.example/books.rss");
        let item = first_item(&rss(
            r#"<title>Both</title>
               <enclosure url="http://f/1.torrent" length="2048" type="application/x-bittorrent"/>
               <torrent:magnetURI>magnet:?xt=urn:btih:cc</torrent:magnetURI>"#,
        ));

        let record =
            normalize_feed_item(&item, &provider, Library::Ebook, &settings(false)).unwrap();
        assert_eq!(record.url, "http://f/1.torrent");
        assert_eq!(record.kind, DownloadKind::Torrent);
        assert_eq!(record.size_bytes, 2048);

        let record =
            normalize_feed_item(&item, &provider, Library::Ebook, &settings(true)).unwrap();
        assert_eq!(record.url, "magnet:?xt=urn:btih:cc");
        assert_eq!(record.kind, DownloadKind::Magnet);
    }

    #[test]
    fn test_feed_item_nzb_wins() {
        let provider = fixtures::rss_provider("feed", "feeds.example/books.rss");
        let item = first_item(&rss(
            r#"<title>Nzb</title>
               <enclosure url="http://f/1.nzb" length="10" type="application/x-nzb"/>
               <torrent:magnetURI>magnet:?xt=urn:btih:dd</torrent:magnetURI>
               <newznab:attr name="usenetdate" value="Sat, 01 Jun 2024 10:00:00 +0000"/>"#,
        ));
        let record =
            normalize_feed_item(&item, &provider, Library::Ebook, &settings(true)).unwrap();
        assert_eq!(record.url, "http://f/1.nzb");
        assert_eq!(record.kind, DownloadKind::Nzb);
        assert_eq!(record.date, "Sat, 01 Jun 2024 10:00:00 +0000");
    }

    #[test]
    fn test_feed_item_bare_link_fallback_and_drops() {
        let provider = fixtures::rss_provider("feed", "feeds.example/books.rss");

        let item = first_item(&rss("<title>Bare</title><link>http://f/book.epub</link>"));
        let record =
            normalize_feed_item(&item, &provider, Library::Ebook, &settings(false)).unwrap();
        assert_eq!(record.url, "http://f/book.epub");
        assert_eq!(record.kind, DownloadKind::Direct);

        let item = first_item(&rss("<title>Nothing</title>"));
        assert!(normalize_feed_item(&item, &provider, Library::Ebook, &settings(false)).is_none());

        let item = first_item(&rss("<link>http://f/untitled</link>"));
        assert!(normalize_feed_item(&item, &provider, Library::Ebook, &settings(false)).is_none());
    }

    #[test]
    fn test_age_in_days() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(age_in_days("Sat, 08 Jun 2024 23:59:59 +0200", today), 7);
        assert_eq!(age_in_days("Fri, 07 Jun 2024 00:00:01 -0500", today), 8);
        assert_eq!(age_in_days("07 Jun 2024 00:00:01 +0000", today), 8);
        assert_eq!(age_in_days("yesterday-ish", today), 0);
        assert_eq!(age_in_days("", today), 0);
    }

    #[test]
    fn test_age_ignores_mislabelled_weekday() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let correct = age_in_days("Mon, 01 Jan 2001 12:00:00 +0000", today);
        assert_eq!(correct, 8566);
        assert_eq!(age_in_days("Fri, 01 Jan 2001 12:00:00 +0000", today), correct);
    }

    fn dated(date: &str) -> ResultRecord {
        ResultRecord {
            provider: "geek".to_string(),
            title: "t".to_string(),
            url: "u".to_string(),
            kind: DownloadKind::Nzb,
            size_bytes: 1,
            date: date.to_string(),
            priority: 0,
            book_id: None,
            library: Library::Ebook,
        }
    }

    #[test]
    fn test_retention_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let default_date = &settings(false).default_date;

        assert!(within_retention(&dated("Sat, 08 Jun 2024 12:00:00 +0000"), 7, default_date, today));
        assert!(!within_retention(&dated("Fri, 07 Jun 2024 12:00:00 +0000"), 7, default_date, today));
        assert!(within_retention(&dated("not a date"), 7, default_date, today));
        assert!(within_retention(&dated("Mon, 01 Jan 2001 12:00:00 +0000"), 0, default_date, today));
        // wrong weekday on an old date is still aged out
        assert!(!within_retention(&dated("Fri, 01 Jan 2001 12:00:00 +0000"), 7, default_date, today));
    }

    #[test]
    fn test_undated_item_kept_with_parsable_default_date() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let settings = NormalizeSettings {
            default_date: "Thu, 01 Jan 1970 00:00:00 +0000".to_string(),
            ..settings(false)
        };
        let provider = fixtures::newznab_provider("geek", "indexer.example");
        let item = first_item(&rss("<title>undated</title><link>http://i/1.nzb</link>"));

        let record = normalize_indexer_item(
            &item,
            &provider,
            IndexerMode::Nzb,
            &SearchRequest::default(),
            &settings,
        )
        .unwrap();
        assert_eq!(record.date, settings.default_date);
        assert!(age_in_days(&record.date, today) > 7);
        assert!(within_retention(&record, 7, &settings.default_date, today));
    }
}
