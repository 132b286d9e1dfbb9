//! In-memory store implementation for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::downloader::Downloader;
use crate::indexer::Indexer;
use crate::store::{
    DownloadStatus, DownloaderStore, Game, GameStatus, GameStore, IndexerStore, Notification,
    NotificationStore, StoreError, TrackedDownload, TrackedDownloadStore,
};

/// Store backed by in-process maps. Mirrors the SQLite store's semantics
/// closely enough for engine tests.
#[derive(Default)]
pub struct MemoryStore {
    indexers: Mutex<HashMap<String, Indexer>>,
    downloaders: Mutex<HashMap<String, Downloader>>,
    games: Mutex<HashMap<String, Game>>,
    tracked: Mutex<HashMap<String, TrackedDownload>>,
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexerStore for MemoryStore {
    fn list_indexers(&self) -> Result<Vec<Indexer>, StoreError> {
        let mut list: Vec<Indexer> = self.indexers.lock().unwrap().values().cloned().collect();
        list.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(list)
    }

    fn get_indexer(&self, id: &str) -> Result<Option<Indexer>, StoreError> {
        Ok(self.indexers.lock().unwrap().get(id).cloned())
    }

    fn upsert_indexer(&self, indexer: &Indexer) -> Result<(), StoreError> {
        self.indexers
            .lock()
            .unwrap()
            .insert(indexer.id.clone(), indexer.clone());
        Ok(())
    }

    fn delete_indexer(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.indexers.lock().unwrap().remove(id).is_some())
    }
}

impl DownloaderStore for MemoryStore {
    fn list_downloaders(&self) -> Result<Vec<Downloader>, StoreError> {
        let mut list: Vec<Downloader> = self.downloaders.lock().unwrap().values().cloned().collect();
        list.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(list)
    }

    fn get_downloader(&self, id: &str) -> Result<Option<Downloader>, StoreError> {
        Ok(self.downloaders.lock().unwrap().get(id).cloned())
    }

    fn upsert_downloader(&self, downloader: &Downloader) -> Result<(), StoreError> {
        self.downloaders
            .lock()
            .unwrap()
            .insert(downloader.id.clone(), downloader.clone());
        Ok(())
    }

    fn delete_downloader(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.downloaders.lock().unwrap().remove(id).is_some())
    }
}

impl GameStore for MemoryStore {
    fn list_games(&self) -> Result<Vec<Game>, StoreError> {
        let mut list: Vec<Game> = self.games.lock().unwrap().values().cloned().collect();
        list.sort_by(|a, b| a.added_at.cmp(&b.added_at));
        Ok(list)
    }

    fn get_game(&self, id: &str) -> Result<Option<Game>, StoreError> {
        Ok(self.games.lock().unwrap().get(id).cloned())
    }

    fn upsert_game(&self, game: &Game) -> Result<(), StoreError> {
        self.games
            .lock()
            .unwrap()
            .insert(game.id.clone(), game.clone());
        Ok(())
    }

    fn set_game_status(&self, id: &str, status: GameStatus) -> Result<(), StoreError> {
        let mut games = self.games.lock().unwrap();
        let game = games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("game {}", id)))?;
        game.status = status;
        Ok(())
    }
}

impl TrackedDownloadStore for MemoryStore {
    fn create_tracked(&self, download: &TrackedDownload) -> Result<(), StoreError> {
        self.tracked
            .lock()
            .unwrap()
            .insert(download.id.clone(), download.clone());
        Ok(())
    }

    fn list_tracked(&self) -> Result<Vec<TrackedDownload>, StoreError> {
        let mut list: Vec<TrackedDownload> = self.tracked.lock().unwrap().values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    fn set_tracked_status(&self, id: &str, status: DownloadStatus) -> Result<(), StoreError> {
        let mut tracked = self.tracked.lock().unwrap();
        let download = tracked
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("tracked download {}", id)))?;
        download.status = status;
        download.updated_at = Utc::now();
        Ok(())
    }
}

impl NotificationStore for MemoryStore {
    fn append_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let mut list = self.notifications.lock().unwrap().clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        Ok(list)
    }
}
