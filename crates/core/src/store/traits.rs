//! Store traits consumed by the engine.
//!
//! The engine never owns persistence; everything below is implemented by the
//! SQLite store in this crate and by the in-memory store in `testing`.

use crate::downloader::Downloader;
use crate::indexer::Indexer;

use super::{DownloadStatus, Game, GameStatus, Notification, StoreError, TrackedDownload};

/// Indexer configuration records.
pub trait IndexerStore: Send + Sync {
    fn list_indexers(&self) -> Result<Vec<Indexer>, StoreError>;
    fn get_indexer(&self, id: &str) -> Result<Option<Indexer>, StoreError>;
    fn upsert_indexer(&self, indexer: &Indexer) -> Result<(), StoreError>;
    fn delete_indexer(&self, id: &str) -> Result<bool, StoreError>;

    fn enabled_indexers(&self) -> Result<Vec<Indexer>, StoreError> {
        Ok(self
            .list_indexers()?
            .into_iter()
            .filter(|i| i.enabled)
            .collect())
    }
}

/// Downloader configuration records.
pub trait DownloaderStore: Send + Sync {
    fn list_downloaders(&self) -> Result<Vec<Downloader>, StoreError>;
    fn get_downloader(&self, id: &str) -> Result<Option<Downloader>, StoreError>;
    fn upsert_downloader(&self, downloader: &Downloader) -> Result<(), StoreError>;
    fn delete_downloader(&self, id: &str) -> Result<bool, StoreError>;
}

/// Game records. The engine reads titles and writes status transitions.
pub trait GameStore: Send + Sync {
    fn list_games(&self) -> Result<Vec<Game>, StoreError>;
    fn get_game(&self, id: &str) -> Result<Option<Game>, StoreError>;
    fn upsert_game(&self, game: &Game) -> Result<(), StoreError>;
    fn set_game_status(&self, id: &str, status: GameStatus) -> Result<(), StoreError>;

    fn wanted_games(&self) -> Result<Vec<Game>, StoreError> {
        Ok(self
            .list_games()?
            .into_iter()
            .filter(|g| g.status == GameStatus::Wanted)
            .collect())
    }
}

/// Tracked download records.
pub trait TrackedDownloadStore: Send + Sync {
    fn create_tracked(&self, download: &TrackedDownload) -> Result<(), StoreError>;
    fn list_tracked(&self) -> Result<Vec<TrackedDownload>, StoreError>;
    fn set_tracked_status(&self, id: &str, status: DownloadStatus) -> Result<(), StoreError>;

    /// Downloads still subject to reconciliation.
    fn active_tracked(&self) -> Result<Vec<TrackedDownload>, StoreError> {
        Ok(self
            .list_tracked()?
            .into_iter()
            .filter(|d| !d.status.is_terminal())
            .collect())
    }
}

/// Append-only notification sink, plus listing for the API surface.
pub trait NotificationStore: Send + Sync {
    fn append_notification(&self, notification: &Notification) -> Result<(), StoreError>;
    fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, StoreError>;
}

/// The full store surface the engine wires against.
pub trait Store:
    IndexerStore + DownloaderStore + GameStore + TrackedDownloadStore + NotificationStore
{
}

impl<T> Store for T where
    T: IndexerStore + DownloaderStore + GameStore + TrackedDownloadStore + NotificationStore
{
}
