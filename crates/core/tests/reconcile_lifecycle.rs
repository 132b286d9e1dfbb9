//! Reconciliation loop lifecycle tests over mock clients and the in-memory
//! store.

use std::sync::Arc;

use chrono::Utc;

use ludarr_core::store::{
    DownloadStatus, DownloaderStore, Game, GameStatus, GameStore, NotificationStore, Store,
    TrackedDownload, TrackedDownloadStore,
};
use ludarr_core::testing::{MemoryStore, MockDownloadClient};
use ludarr_core::{
    DownloadKind, Downloader, DownloaderGateway, DownloaderKind, NotificationKind, Reconciler,
    RemoteDownload, RemoteStatus,
};

struct Fixture {
    store: Arc<MemoryStore>,
    client: Arc<MockDownloadClient>,
    reconciler: Reconciler,
}

fn downloader(id: &str, enabled: bool) -> Downloader {
    Downloader {
        id: id.to_string(),
        name: format!("Transmission-{}", id),
        kind: DownloaderKind::Transmission,
        url: "http://127.0.0.1:9091".to_string(),
        username: None,
        password: None,
        api_key: None,
        enabled,
        priority: 1,
        category: None,
        download_path: None,
    }
}

fn game(id: &str, status: GameStatus) -> Game {
    Game {
        id: id.to_string(),
        title: format!("Game {}", id),
        status,
        added_at: Utc::now(),
    }
}

fn tracked(id: &str, game_id: &str, downloader_id: &str, hash: &str) -> TrackedDownload {
    let now = Utc::now();
    TrackedDownload {
        id: id.to_string(),
        game_id: game_id.to_string(),
        downloader_id: downloader_id.to_string(),
        hash: hash.to_string(),
        title: format!("Release {}", id),
        status: DownloadStatus::Downloading,
        kind: DownloadKind::Torrent,
        created_at: now,
        updated_at: now,
    }
}

fn remote(id: &str, status: RemoteStatus, progress: f64) -> RemoteDownload {
    RemoteDownload {
        id: id.to_string(),
        name: id.to_string(),
        status,
        progress,
        error: None,
    }
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let client = Arc::new(MockDownloadClient::new(DownloaderKind::Transmission));
    let gateway = Arc::new(DownloaderGateway::empty().with_client(Arc::clone(&client) as Arc<_>));
    let reconciler = Reconciler::new(Arc::clone(&store) as Arc<dyn Store>, gateway);
    Fixture {
        store,
        client,
        reconciler,
    }
}

#[tokio::test]
async fn completion_marks_game_owned_and_notifies_once() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", true)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    f.store.create_tracked(&tracked("t1", "g1", "d1", "abc123")).unwrap();
    f.client
        .set_remote_list("d1", vec![remote("abc123", RemoteStatus::Downloading, 100.0)])
        .await;

    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.vanished, 0);

    let downloads = f.store.list_tracked().unwrap();
    assert_eq!(downloads[0].status, DownloadStatus::Completed);
    assert_eq!(
        f.store.get_game("g1").unwrap().unwrap().status,
        GameStatus::Owned
    );

    let notifications = f.store.list_notifications(10).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Success);

    // Terminal rows are excluded from the next cycle: no second notification.
    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.groups, 0);
    assert_eq!(summary.completed, 0);
    assert_eq!(f.store.list_notifications(10).unwrap().len(), 1);
}

#[tokio::test]
async fn seeding_status_counts_as_complete() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", true)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    f.store.create_tracked(&tracked("t1", "g1", "d1", "abc123")).unwrap();
    f.client
        .set_remote_list("d1", vec![remote("abc123", RemoteStatus::Seeding, 42.0)])
        .await;

    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(
        f.store.get_game("g1").unwrap().unwrap().status,
        GameStatus::Owned
    );
}

#[tokio::test]
async fn remote_error_fails_download_and_resets_game() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", true)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    f.store.create_tracked(&tracked("t1", "g1", "d1", "abc123")).unwrap();

    let mut errored = remote("abc123", RemoteStatus::Error, 12.0);
    errored.error = Some("tracker unreachable".to_string());
    f.client.set_remote_list("d1", vec![errored]).await;

    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(
        f.store.list_tracked().unwrap()[0].status,
        DownloadStatus::Failed
    );
    assert_eq!(
        f.store.get_game("g1").unwrap().unwrap().status,
        GameStatus::Wanted
    );

    let notifications = f.store.list_notifications(10).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Warning);
    assert!(notifications[0].message.contains("tracker unreachable"));

    // Failed is terminal: the next cycle must not resurrect it.
    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.groups, 0);
    assert_eq!(
        f.store.list_tracked().unwrap()[0].status,
        DownloadStatus::Failed
    );
}

#[tokio::test]
async fn status_writes_only_happen_on_change() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", true)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    f.store.create_tracked(&tracked("t1", "g1", "d1", "abc123")).unwrap();
    f.client
        .set_remote_list("d1", vec![remote("abc123", RemoteStatus::Downloading, 10.0)])
        .await;

    f.reconciler.run_cycle().await.unwrap();
    let untouched = f.store.list_tracked().unwrap()[0].updated_at;

    // Same remote status again: no store churn.
    f.reconciler.run_cycle().await.unwrap();
    assert_eq!(f.store.list_tracked().unwrap()[0].updated_at, untouched);

    // Pause flows through and bumps the row once.
    f.client
        .set_remote_list("d1", vec![remote("abc123", RemoteStatus::Paused, 10.0)])
        .await;
    f.reconciler.run_cycle().await.unwrap();
    let paused = &f.store.list_tracked().unwrap()[0];
    assert_eq!(paused.status, DownloadStatus::Paused);
    assert!(paused.updated_at > untouched);
    // Game stays downloading while paused.
    assert_eq!(
        f.store.get_game("g1").unwrap().unwrap().status,
        GameStatus::Downloading
    );
}

#[tokio::test]
async fn vanished_download_assumes_completion_with_info_notification() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", true)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    f.store.create_tracked(&tracked("t1", "g1", "d1", "abc123")).unwrap();
    f.client.set_remote_list("d1", vec![]).await;

    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.vanished, 1);
    assert_eq!(summary.completed, 1);

    assert_eq!(
        f.store.list_tracked().unwrap()[0].status,
        DownloadStatus::Completed
    );
    assert_eq!(
        f.store.get_game("g1").unwrap().unwrap().status,
        GameStatus::Owned
    );

    let notifications = f.store.list_notifications(10).unwrap();
    assert_eq!(notifications.len(), 1);
    // Informational, not an error: the completion is an assumption.
    assert_eq!(notifications[0].kind, NotificationKind::Info);
    assert!(notifications[0].message.contains("assuming"));
}

#[tokio::test]
async fn disabled_and_missing_downloaders_are_skipped() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", false)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    f.store.upsert_game(&game("g2", GameStatus::Downloading)).unwrap();
    f.store.create_tracked(&tracked("t1", "g1", "d1", "aaa")).unwrap();
    // t2 references a downloader that no longer exists.
    f.store.create_tracked(&tracked("t2", "g2", "ghost", "bbb")).unwrap();

    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.skipped_groups, 2);
    assert_eq!(summary.completed, 0);

    // Nothing moved.
    for download in f.store.list_tracked().unwrap() {
        assert_eq!(download.status, DownloadStatus::Downloading);
    }
}

#[tokio::test]
async fn one_failing_downloader_does_not_stall_the_rest() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", true)).unwrap();
    f.store.upsert_downloader(&downloader("d2", true)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    f.store.upsert_game(&game("g2", GameStatus::Downloading)).unwrap();
    f.store.create_tracked(&tracked("t1", "g1", "d1", "aaa")).unwrap();
    f.store.create_tracked(&tracked("t2", "g2", "d2", "bbb")).unwrap();

    f.client.fail_list_for("d1").await;
    f.client
        .set_remote_list("d2", vec![remote("bbb", RemoteStatus::Completed, 100.0)])
        .await;

    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.skipped_groups, 1);
    assert_eq!(summary.completed, 1);

    let downloads = f.store.list_tracked().unwrap();
    let t1 = downloads.iter().find(|d| d.id == "t1").unwrap();
    let t2 = downloads.iter().find(|d| d.id == "t2").unwrap();
    assert_eq!(t1.status, DownloadStatus::Downloading);
    assert_eq!(t2.status, DownloadStatus::Completed);
}

#[tokio::test]
async fn hash_matching_is_case_insensitive() {
    let f = fixture();
    f.store.upsert_downloader(&downloader("d1", true)).unwrap();
    f.store.upsert_game(&game("g1", GameStatus::Downloading)).unwrap();
    let mut t = tracked("t1", "g1", "d1", "ABC123");
    t.hash = "ABC123".to_string();
    f.store.create_tracked(&t).unwrap();
    f.client
        .set_remote_list("d1", vec![remote("abc123", RemoteStatus::Completed, 100.0)])
        .await;

    let summary = f.reconciler.run_cycle().await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.vanished, 0);
}
