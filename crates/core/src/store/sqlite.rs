//! SQLite-backed store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::downloader::{DownloadKind, Downloader, DownloaderKind};
use crate::indexer::{Indexer, IndexerProtocol};

use super::{
    DownloadStatus, DownloaderStore, Game, GameStatus, GameStore, IndexerStore, Notification,
    NotificationKind, NotificationStore, StoreError, TrackedDownload, TrackedDownloadStore,
};

/// SQLite store covering every record family in one database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and initialize) the database file.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS indexers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                api_key TEXT NOT NULL,
                protocol TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                priority INTEGER NOT NULL DEFAULT 25,
                categories TEXT NOT NULL DEFAULT '[]',
                rss_enabled INTEGER NOT NULL DEFAULT 1,
                auto_search_enabled INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS downloaders (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                url TEXT NOT NULL,
                username TEXT,
                password TEXT,
                api_key TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                priority INTEGER NOT NULL DEFAULT 25,
                category TEXT,
                download_path TEXT
            );

            CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                added_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tracked_downloads (
                id TEXT PRIMARY KEY,
                game_id TEXT NOT NULL,
                downloader_id TEXT NOT NULL,
                hash TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                user_id TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tracked_status ON tracked_downloads(status);
            CREATE INDEX IF NOT EXISTS idx_games_status ON games(status);
            CREATE INDEX IF NOT EXISTS idx_notifications_created ON notifications(created_at DESC);
            "#,
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn row_to_indexer(row: &rusqlite::Row) -> rusqlite::Result<Indexer> {
        let protocol_str: String = row.get(4)?;
        let categories_json: String = row.get(7)?;
        Ok(Indexer {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            api_key: row.get(3)?,
            protocol: IndexerProtocol::parse(&protocol_str).unwrap_or(IndexerProtocol::Torznab),
            enabled: row.get(5)?,
            priority: row.get(6)?,
            categories: serde_json::from_str(&categories_json).unwrap_or_default(),
            rss_enabled: row.get(8)?,
            auto_search_enabled: row.get(9)?,
        })
    }

    fn row_to_downloader(row: &rusqlite::Row) -> rusqlite::Result<Downloader> {
        let kind_str: String = row.get(2)?;
        Ok(Downloader {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: DownloaderKind::parse(&kind_str).unwrap_or(DownloaderKind::Transmission),
            url: row.get(3)?,
            username: row.get(4)?,
            password: row.get(5)?,
            api_key: row.get(6)?,
            enabled: row.get(7)?,
            priority: row.get(8)?,
            category: row.get(9)?,
            download_path: row.get(10)?,
        })
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<Game> {
        let status_str: String = row.get(2)?;
        let added_at_str: String = row.get(3)?;
        Ok(Game {
            id: row.get(0)?,
            title: row.get(1)?,
            status: GameStatus::parse(&status_str).unwrap_or(GameStatus::Wanted),
            added_at: parse_ts(&added_at_str),
        })
    }

    fn row_to_tracked(row: &rusqlite::Row) -> rusqlite::Result<TrackedDownload> {
        let status_str: String = row.get(5)?;
        let kind_str: String = row.get(6)?;
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;
        Ok(TrackedDownload {
            id: row.get(0)?,
            game_id: row.get(1)?,
            downloader_id: row.get(2)?,
            hash: row.get(3)?,
            title: row.get(4)?,
            status: DownloadStatus::parse(&status_str).unwrap_or(DownloadStatus::Downloading),
            kind: if kind_str == "usenet" {
                DownloadKind::Usenet
            } else {
                DownloadKind::Torrent
            },
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
        let kind_str: String = row.get(1)?;
        let created_at_str: String = row.get(5)?;
        Ok(Notification {
            id: row.get(0)?,
            kind: NotificationKind::parse(&kind_str).unwrap_or(NotificationKind::Info),
            title: row.get(2)?,
            message: row.get(3)?,
            user_id: row.get(4)?,
            created_at: parse_ts(&created_at_str),
        })
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl IndexerStore for SqliteStore {
    fn list_indexers(&self) -> Result<Vec<Indexer>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, url, api_key, protocol, enabled, priority, categories, rss_enabled, auto_search_enabled FROM indexers ORDER BY priority ASC, name ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], Self::row_to_indexer)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_indexer(&self, id: &str) -> Result<Option<Indexer>, StoreError> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, name, url, api_key, protocol, enabled, priority, categories, rss_enabled, auto_search_enabled FROM indexers WHERE id = ?",
            params![id],
            Self::row_to_indexer,
        ) {
            Ok(indexer) => Ok(Some(indexer)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn upsert_indexer(&self, indexer: &Indexer) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let categories =
            serde_json::to_string(&indexer.categories).map_err(|e| StoreError::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO indexers (id, name, url, api_key, protocol, enabled, priority, categories, rss_enabled, auto_search_enabled)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                api_key = excluded.api_key,
                protocol = excluded.protocol,
                enabled = excluded.enabled,
                priority = excluded.priority,
                categories = excluded.categories,
                rss_enabled = excluded.rss_enabled,
                auto_search_enabled = excluded.auto_search_enabled",
            params![
                indexer.id,
                indexer.name,
                indexer.url,
                indexer.api_key,
                indexer.protocol.as_str(),
                indexer.enabled,
                indexer.priority,
                categories,
                indexer.rss_enabled,
                indexer.auto_search_enabled,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn delete_indexer(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute("DELETE FROM indexers WHERE id = ?", params![id])
            .map_err(db_err)?;
        Ok(affected > 0)
    }
}

impl DownloaderStore for SqliteStore {
    fn list_downloaders(&self) -> Result<Vec<Downloader>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, kind, url, username, password, api_key, enabled, priority, category, download_path FROM downloaders ORDER BY priority ASC, name ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], Self::row_to_downloader)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_downloader(&self, id: &str) -> Result<Option<Downloader>, StoreError> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, name, kind, url, username, password, api_key, enabled, priority, category, download_path FROM downloaders WHERE id = ?",
            params![id],
            Self::row_to_downloader,
        ) {
            Ok(downloader) => Ok(Some(downloader)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn upsert_downloader(&self, downloader: &Downloader) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO downloaders (id, name, kind, url, username, password, api_key, enabled, priority, category, download_path)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                url = excluded.url,
                username = excluded.username,
                password = excluded.password,
                api_key = excluded.api_key,
                enabled = excluded.enabled,
                priority = excluded.priority,
                category = excluded.category,
                download_path = excluded.download_path",
            params![
                downloader.id,
                downloader.name,
                downloader.kind.as_str(),
                downloader.url,
                downloader.username,
                downloader.password,
                downloader.api_key,
                downloader.enabled,
                downloader.priority,
                downloader.category,
                downloader.download_path,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn delete_downloader(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute("DELETE FROM downloaders WHERE id = ?", params![id])
            .map_err(db_err)?;
        Ok(affected > 0)
    }
}

impl GameStore for SqliteStore {
    fn list_games(&self) -> Result<Vec<Game>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, title, status, added_at FROM games ORDER BY added_at ASC")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], Self::row_to_game)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_game(&self, id: &str) -> Result<Option<Game>, StoreError> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, title, status, added_at FROM games WHERE id = ?",
            params![id],
            Self::row_to_game,
        ) {
            Ok(game) => Ok(Some(game)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn upsert_game(&self, game: &Game) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO games (id, title, status, added_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, status = excluded.status",
            params![
                game.id,
                game.title,
                game.status.as_str(),
                game.added_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn set_game_status(&self, id: &str, status: GameStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "UPDATE games SET status = ? WHERE id = ?",
                params![status.as_str(), id],
            )
            .map_err(db_err)?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("game {}", id)));
        }
        Ok(())
    }
}

impl TrackedDownloadStore for SqliteStore {
    fn create_tracked(&self, download: &TrackedDownload) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracked_downloads (id, game_id, downloader_id, hash, title, status, kind, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                download.id,
                download.game_id,
                download.downloader_id,
                download.hash,
                download.title,
                download.status.as_str(),
                download.kind.as_str(),
                download.created_at.to_rfc3339(),
                download.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn list_tracked(&self) -> Result<Vec<TrackedDownload>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, game_id, downloader_id, hash, title, status, kind, created_at, updated_at FROM tracked_downloads ORDER BY created_at ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], Self::row_to_tracked)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn set_tracked_status(&self, id: &str, status: DownloadStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "UPDATE tracked_downloads SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), Utc::now().to_rfc3339(), id],
            )
            .map_err(db_err)?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("tracked download {}", id)));
        }
        Ok(())
    }
}

impl NotificationStore for SqliteStore {
    fn append_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO notifications (id, kind, title, message, user_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                notification.id,
                notification.kind.as_str(),
                notification.title,
                notification.message,
                notification.user_id,
                notification.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, kind, title, message, user_id, created_at FROM notifications ORDER BY created_at DESC LIMIT ?",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_notification)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_indexer() -> Indexer {
        Indexer {
            id: "i1".to_string(),
            name: "local".to_string(),
            url: "http://127.0.0.1:9117".to_string(),
            api_key: "k".to_string(),
            protocol: IndexerProtocol::Torznab,
            enabled: true,
            priority: 25,
            categories: vec!["4050".to_string()],
            rss_enabled: true,
            auto_search_enabled: true,
        }
    }

    fn sample_downloader() -> Downloader {
        Downloader {
            id: "d1".to_string(),
            name: "Transmission".to_string(),
            kind: DownloaderKind::Transmission,
            url: "http://127.0.0.1:9091".to_string(),
            username: None,
            password: None,
            api_key: None,
            enabled: true,
            priority: 1,
            category: Some("games".to_string()),
            download_path: None,
        }
    }

    #[test]
    fn test_indexer_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_indexer(&sample_indexer()).unwrap();

        let loaded = store.get_indexer("i1").unwrap().unwrap();
        assert_eq!(loaded.name, "local");
        assert_eq!(loaded.protocol, IndexerProtocol::Torznab);
        assert_eq!(loaded.categories, vec!["4050".to_string()]);

        let mut updated = sample_indexer();
        updated.enabled = false;
        store.upsert_indexer(&updated).unwrap();
        assert!(!store.get_indexer("i1").unwrap().unwrap().enabled);
        assert!(store.enabled_indexers().unwrap().is_empty());

        assert!(store.delete_indexer("i1").unwrap());
        assert!(!store.delete_indexer("i1").unwrap());
        assert!(store.get_indexer("i1").unwrap().is_none());
    }

    #[test]
    fn test_downloader_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_downloader(&sample_downloader()).unwrap();

        let loaded = store.get_downloader("d1").unwrap().unwrap();
        assert_eq!(loaded.kind, DownloaderKind::Transmission);
        assert_eq!(loaded.category.as_deref(), Some("games"));
        assert!(loaded.username.is_none());
    }

    #[test]
    fn test_downloaders_listed_by_priority() {
        let store = SqliteStore::in_memory().unwrap();
        let mut second = sample_downloader();
        second.id = "d2".to_string();
        second.name = "SABnzbd".to_string();
        second.kind = DownloaderKind::Sabnzbd;
        second.priority = 2;
        store.upsert_downloader(&second).unwrap();
        store.upsert_downloader(&sample_downloader()).unwrap();

        let list = store.list_downloaders().unwrap();
        assert_eq!(list[0].id, "d1");
        assert_eq!(list[1].id, "d2");
    }

    #[test]
    fn test_game_status_transitions() {
        let store = SqliteStore::in_memory().unwrap();
        let game = Game {
            id: "g1".to_string(),
            title: "Hollow Depths".to_string(),
            status: GameStatus::Wanted,
            added_at: Utc::now(),
        };
        store.upsert_game(&game).unwrap();
        assert_eq!(store.wanted_games().unwrap().len(), 1);

        store.set_game_status("g1", GameStatus::Owned).unwrap();
        assert_eq!(
            store.get_game("g1").unwrap().unwrap().status,
            GameStatus::Owned
        );
        assert!(store.wanted_games().unwrap().is_empty());

        assert!(matches!(
            store.set_game_status("missing", GameStatus::Owned),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_tracked_download_lifecycle() {
        let store = SqliteStore::in_memory().unwrap();
        let now = Utc::now();
        let tracked = TrackedDownload {
            id: "t1".to_string(),
            game_id: "g1".to_string(),
            downloader_id: "d1".to_string(),
            hash: "abc123".to_string(),
            title: "Hollow Depths".to_string(),
            status: DownloadStatus::Downloading,
            kind: DownloadKind::Torrent,
            created_at: now,
            updated_at: now,
        };
        store.create_tracked(&tracked).unwrap();
        assert_eq!(store.active_tracked().unwrap().len(), 1);

        store
            .set_tracked_status("t1", DownloadStatus::Completed)
            .unwrap();
        assert!(store.active_tracked().unwrap().is_empty());
        assert_eq!(store.list_tracked().unwrap().len(), 1);
    }

    #[test]
    fn test_notifications_append_and_list() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..3i64 {
            let mut n = Notification::new(
                NotificationKind::Info,
                format!("n{}", i),
                "message",
            );
            n.created_at = Utc::now() + chrono::Duration::seconds(i);
            store.append_notification(&n).unwrap();
        }
        let listed = store.list_notifications(2).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "n2");
    }
}
