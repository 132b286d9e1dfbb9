//! Aggregate search tests over mock protocol clients and the in-memory
//! store.

use std::sync::Arc;

use ludarr_core::store::IndexerStore;
use ludarr_core::testing::{make_result, MemoryStore, MockIndexerClient};
use ludarr_core::{Indexer, IndexerError, IndexerProtocol, SearchAggregator};

fn indexer(id: &str, name: &str, protocol: IndexerProtocol, enabled: bool) -> Indexer {
    Indexer {
        id: id.to_string(),
        name: name.to_string(),
        url: format!("http://127.0.0.1:9117/{}", id),
        api_key: "k".to_string(),
        protocol,
        enabled,
        priority: 25,
        categories: vec![],
        rss_enabled: true,
        auto_search_enabled: true,
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    torznab: Arc<MockIndexerClient>,
    newznab: Arc<MockIndexerClient>,
    aggregator: SearchAggregator,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let torznab = Arc::new(MockIndexerClient::new(IndexerProtocol::Torznab));
    let newznab = Arc::new(MockIndexerClient::new(IndexerProtocol::Newznab));
    let aggregator = SearchAggregator::new(Arc::clone(&store) as Arc<dyn IndexerStore>)
        .with_client(Arc::clone(&torznab) as Arc<_>)
        .with_client(Arc::clone(&newznab) as Arc<_>);
    Fixture {
        store,
        torznab,
        newznab,
        aggregator,
    }
}

#[tokio::test]
async fn empty_enabled_set_is_a_hard_error() {
    let f = fixture();
    let result = f.aggregator.search_all("hollow depths", None, None).await;
    assert!(matches!(result, Err(IndexerError::NoIndexersAvailable)));

    // A disabled indexer does not count.
    f.store
        .upsert_indexer(&indexer("i1", "one", IndexerProtocol::Torznab, false))
        .unwrap();
    let result = f.aggregator.search_all("hollow depths", None, None).await;
    assert!(matches!(result, Err(IndexerError::NoIndexersAvailable)));
}

#[tokio::test]
async fn failure_of_one_indexer_does_not_affect_siblings() {
    let f = fixture();
    let a = indexer("a", "alpha", IndexerProtocol::Torznab, true);
    let b = indexer("b", "beta", IndexerProtocol::Torznab, true);
    f.store.upsert_indexer(&a).unwrap();
    f.store.upsert_indexer(&b).unwrap();

    f.torznab.fail("a", "connection refused").await;
    f.torznab
        .set_results("b", vec![make_result("Hollow Depths", &b, Some(9))])
        .await;

    let search = f
        .aggregator
        .search_all("hollow depths", None, None)
        .await
        .unwrap();

    assert_eq!(search.items.len(), 1);
    assert_eq!(search.items[0].indexer_name, "beta");
    assert_eq!(search.errors.len(), 1);
    assert!(search.errors[0].contains("alpha"));
    assert!(search.errors[0].contains("connection refused"));
}

#[tokio::test]
async fn results_merge_and_sort_across_indexers() {
    let f = fixture();
    let a = indexer("a", "alpha", IndexerProtocol::Torznab, true);
    let b = indexer("b", "beta", IndexerProtocol::Torznab, true);
    f.store.upsert_indexer(&a).unwrap();
    f.store.upsert_indexer(&b).unwrap();

    f.torznab
        .set_results(
            "a",
            vec![
                make_result("Hollow Depths GOTY", &a, Some(3)),
                make_result("Hollow Depths", &a, Some(40)),
            ],
        )
        .await;
    f.torznab
        .set_results("b", vec![make_result("Hollow Depths Repack", &b, Some(12))])
        .await;

    let search = f
        .aggregator
        .search_all("hollow depths", None, None)
        .await
        .unwrap();

    assert_eq!(search.items.len(), 3);
    assert!(search.errors.is_empty());
    let titles: Vec<&str> = search.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Hollow Depths", "Hollow Depths Repack", "Hollow Depths GOTY"]
    );
}

#[tokio::test]
async fn both_protocols_fan_out_and_items_keep_their_kind() {
    let f = fixture();
    let t = indexer("t", "torrents", IndexerProtocol::Torznab, true);
    let n = indexer("n", "usenet", IndexerProtocol::Newznab, true);
    f.store.upsert_indexer(&t).unwrap();
    f.store.upsert_indexer(&n).unwrap();

    f.torznab
        .set_results("t", vec![make_result("Hollow Depths", &t, Some(5))])
        .await;
    let mut usenet_item = make_result("Hollow Depths NZB", &n, None);
    usenet_item.grabs = Some(80);
    f.newznab.set_results("n", vec![usenet_item]).await;

    let search = f
        .aggregator
        .search_all("hollow depths", None, None)
        .await
        .unwrap();

    assert_eq!(search.items.len(), 2);
    // Usenet item ranks by grabs and wins here.
    assert_eq!(search.items[0].title, "Hollow Depths NZB");
    assert_eq!(
        search.items[0].download_kind,
        ludarr_core::DownloadKind::Usenet
    );
    assert_eq!(
        search.items[1].download_kind,
        ludarr_core::DownloadKind::Torrent
    );

    // Each protocol client saw exactly its own indexer.
    assert_eq!(f.torznab.searches().await.len(), 1);
    assert_eq!(f.newznab.searches().await.len(), 1);
}

#[tokio::test]
async fn disabled_indexers_are_never_queried() {
    let f = fixture();
    let on = indexer("on", "enabled", IndexerProtocol::Torznab, true);
    let off = indexer("off", "disabled", IndexerProtocol::Torznab, false);
    f.store.upsert_indexer(&on).unwrap();
    f.store.upsert_indexer(&off).unwrap();

    f.aggregator
        .search_all("hollow depths", None, None)
        .await
        .unwrap();

    let searches = f.torznab.searches().await;
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].0, "on");
}

#[tokio::test]
async fn every_indexer_failing_still_returns_structured_errors() {
    let f = fixture();
    let a = indexer("a", "alpha", IndexerProtocol::Torznab, true);
    let b = indexer("b", "beta", IndexerProtocol::Torznab, true);
    f.store.upsert_indexer(&a).unwrap();
    f.store.upsert_indexer(&b).unwrap();
    f.torznab.fail("a", "timeout").await;
    f.torznab.fail("b", "http 500").await;

    let search = f
        .aggregator
        .search_all("hollow depths", None, None)
        .await
        .unwrap();
    assert!(search.items.is_empty());
    assert_eq!(search.errors.len(), 2);
}
