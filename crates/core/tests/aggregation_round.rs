//! Aggregation round integration tests.
//!
//! These tests drive the aggregator against a scripted fetcher and a
//! file-backed provider store:
//! - failure isolation between providers in one round
//! - blocklist skipping and expiry
//! - capability refresh and downgrade persisted to the providers file
//! - combined rounds across families

use std::sync::Arc;

use tempfile::TempDir;

use shelfscout_core::{
    provider::{CapabilityVerb, WishlistFormat},
    testing::{fixtures, MockFetcher},
    Aggregator, Blocklist, DownloadKind, FetchError, MemoryProviderStore, Provider, ProviderStore,
    SearchRequest, SearchSettings, SearchType, TomlProviderStore,
};

/// Test helper wiring an aggregator to a mock fetcher.
struct TestHarness {
    fetcher: Arc<MockFetcher>,
    store: Arc<dyn ProviderStore>,
    blocklist: Arc<Blocklist>,
    aggregator: Aggregator,
}

impl TestHarness {
    fn with_store(store: Arc<dyn ProviderStore>, settings: SearchSettings) -> Self {
        let fetcher = Arc::new(MockFetcher::new());
        let blocklist = Arc::new(Blocklist::from_settings(&settings));
        let aggregator = Aggregator::new(
            settings,
            fetcher.clone(),
            store.clone(),
            blocklist.clone(),
        );
        Self {
            fetcher,
            store,
            blocklist,
            aggregator,
        }
    }

    fn new(providers: Vec<Provider>) -> Self {
        Self::with_store(
            Arc::new(MemoryProviderStore::new(providers)),
            SearchSettings::default(),
        )
    }
}

fn book_request() -> SearchRequest {
    SearchRequest::book("Tom Holt", "Flying Dutch").with_book_id("b42")
}

#[tokio::test]
async fn test_failing_provider_does_not_affect_others() {
    let h = TestHarness::new(vec![
        fixtures::book_indexer("alpha", "alpha.example"),
        fixtures::book_indexer("beta", "beta.example"),
    ]);
    h.fetcher
        .fail("alpha.example", FetchError::Connection("connection refused".to_string()))
        .await;
    h.fetcher.respond("beta.example", fixtures::NEWZNAB_ITEMS_XML).await;

    let out = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;

    assert_eq!(out.results.len(), 2);
    assert!(out.results.iter().all(|r| r.provider == "beta"));
    assert_eq!(out.providers_queried, 2);
    assert!(h.blocklist.is_blocked("alpha").await);
    assert!(!h.blocklist.is_blocked("beta").await);

    let entries = h.blocklist.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, "Connection failed: connection refused");
}

#[tokio::test]
async fn test_blocked_provider_is_skipped_next_round() {
    let h = TestHarness::new(vec![fixtures::book_indexer("alpha", "alpha.example")]);
    h.fetcher.fail("alpha.example", FetchError::Timeout).await;

    let first = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;
    assert_eq!(first.providers_queried, 1);
    assert_eq!(h.fetcher.requests().await.len(), 1);

    let second = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;
    assert_eq!(second.providers_queried, 0);
    assert_eq!(h.fetcher.requests().await.len(), 1);
}

#[tokio::test]
async fn test_zero_timer_never_blocks() {
    let settings = SearchSettings {
        blocklist_timer_secs: 0,
        ..Default::default()
    };
    let h = TestHarness::with_store(
        Arc::new(MemoryProviderStore::new(vec![fixtures::book_indexer(
            "alpha",
            "alpha.example",
        )])),
        settings,
    );
    h.fetcher.fail("alpha.example", FetchError::Timeout).await;

    h.aggregator.query_newznab(&book_request(), SearchType::Book).await;
    let again = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;

    assert_eq!(again.providers_queried, 1);
    assert!(h.blocklist.is_empty().await);
}

#[tokio::test]
async fn test_healthy_provider_with_no_results_is_counted() {
    let h = TestHarness::new(vec![fixtures::book_indexer("alpha", "alpha.example")]);
    h.fetcher
        .respond("alpha.example", "<rss><channel><title>empty</title></channel></rss>")
        .await;

    let out = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;
    assert!(out.results.is_empty());
    assert_eq!(out.providers_queried, 1);
}

#[tokio::test]
async fn test_downgrade_is_persisted_to_providers_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("providers.toml");
    let store = TomlProviderStore::open(&path).expect("Failed to open store");
    store
        .put(fixtures::book_indexer("alpha", "alpha.example"))
        .await
        .unwrap();

    let h = TestHarness::with_store(Arc::new(store), SearchSettings::default());
    h.fetcher
        .fail(
            "t=book",
            FetchError::Status {
                status: "400 Bad Request".to_string(),
                body: "unknown parameter".to_string(),
            },
        )
        .await;

    let out = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;
    assert_eq!(out.providers_queried, 1);
    assert!(!h.blocklist.is_blocked("alpha").await);

    // reopen from disk
    let reopened = TomlProviderStore::open(&path).expect("Failed to reopen store");
    let alpha = reopened.get("alpha").await.unwrap();
    let caps = alpha.caps().unwrap();
    assert!(caps.verb(CapabilityVerb::Book).is_none());
    assert_eq!(caps.book_categories, vec!["7000", "7020"]);

    // next round falls back to general search against the book category
    h.fetcher.respond("t=search", fixtures::NEWZNAB_ITEMS_XML).await;
    let out = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;
    assert_eq!(out.results.len(), 2);
    let last = h.fetcher.requests().await.pop().unwrap();
    assert!(last.contains("t=search&q=Tom%20Holt%20Flying%20Dutch&cat=7000%2C7020"));
}

#[tokio::test]
async fn test_stale_capabilities_refreshed_before_query() {
    let mut alpha = fixtures::newznab_provider("alpha", "alpha.example");
    alpha.indexer_mut().unwrap().caps.updated = chrono::NaiveDate::from_ymd_opt(2000, 1, 1);
    let h = TestHarness::new(vec![alpha]);
    h.fetcher.respond("t=caps", fixtures::CAPS_XML).await;
    h.fetcher.respond("t=book", fixtures::NEWZNAB_ITEMS_XML).await;

    let out = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;

    assert_eq!(out.results.len(), 2);
    assert!(out.results.iter().all(|r| r.book_id.as_deref() == Some("b42")));
    let requests = h.fetcher.requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[0].ends_with("/api?t=caps"));
    assert!(requests[1].contains("t=book"));

    let stored = h.store.get("alpha").await.unwrap();
    assert_eq!(stored.caps().unwrap().book_search.as_deref(), Some("book"));
}

#[tokio::test]
async fn test_provider_without_usable_query_is_not_counted() {
    let mut general_only = fixtures::newznab_provider("alpha", "alpha.example");
    general_only.indexer_mut().unwrap().caps.updated = Some(chrono::Local::now().date_naive());
    let h = TestHarness::new(vec![general_only]);

    let out = h.aggregator.query_newznab(&book_request(), SearchType::Book).await;
    assert_eq!(out.providers_queried, 0);
    assert!(h.fetcher.requests().await.is_empty());
    assert!(!h.blocklist.is_blocked("alpha").await);
}

#[tokio::test]
async fn test_query_all_concatenates_families_in_order() {
    let h = TestHarness::new(vec![
        fixtures::direct_provider("gen", "libgen.example"),
        fixtures::torrent_site_provider("lime", "lime.example"),
        fixtures::book_indexer("alpha", "alpha.example"),
        fixtures::rss_provider("feed", "feeds.example"),
    ]);
    h.fetcher.respond("alpha.example", fixtures::NEWZNAB_ITEMS_XML).await;
    h.fetcher.respond("lime.example", fixtures::TORRENT_RSS_XML).await;
    h.fetcher.respond("libgen.example", fixtures::LIBGEN_HTML).await;

    let out = h.aggregator.query_all(&book_request(), SearchType::Book).await;

    assert_eq!(out.providers_queried, 3);
    let providers: Vec<_> = out.results.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(
        providers,
        vec!["alpha", "alpha", "lime", "lime", "gen", "gen"]
    );
    assert_eq!(out.results[0].kind, DownloadKind::Nzb);
    assert_eq!(out.results[5].kind, DownloadKind::Direct);
}

#[tokio::test]
async fn test_rss_and_wishlist_rounds() {
    let h = TestHarness::new(vec![
        fixtures::rss_provider("feed", "feeds.example/books.rss"),
        fixtures::wishlist_provider(
            "shelf",
            "goodreads.example/review/list_rss/1",
            WishlistFormat::Feed,
            0,
        ),
    ]);
    h.fetcher.respond("feeds.example", fixtures::TORRENT_RSS_XML).await;
    h.fetcher.respond("goodreads.example", fixtures::WISHLIST_RSS_XML).await;

    let rss = h.aggregator.query_rss().await;
    assert_eq!(rss.providers_queried, 1);
    assert_eq!(rss.results.len(), 2);

    let wanted = h.aggregator.query_wishlists().await;
    assert_eq!(wanted.providers_queried, 1);
    assert_eq!(wanted.results.len(), 1);
    assert_eq!(wanted.results[0].author, "Terry Pratchett");
}
