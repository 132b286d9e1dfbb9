//! Records owned by the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::downloader::DownloadKind;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Game acquisition status. The engine moves games between these; release
/// date logic elsewhere also writes to this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Wanted,
    Downloading,
    Owned,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Wanted => "wanted",
            GameStatus::Downloading => "downloading",
            GameStatus::Owned => "owned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wanted" => Some(GameStatus::Wanted),
            "downloading" => Some(GameStatus::Downloading),
            "owned" => Some(GameStatus::Owned),
            _ => None,
        }
    }
}

/// A tracked game title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub title: String,
    pub status: GameStatus,
    pub added_at: DateTime<Utc>,
}

/// Lifecycle status of a tracked download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloading,
    Paused,
    Failed,
    Completed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "downloading" => Some(DownloadStatus::Downloading),
            "paused" => Some(DownloadStatus::Paused),
            "failed" => Some(DownloadStatus::Failed),
            "completed" => Some(DownloadStatus::Completed),
            _ => None,
        }
    }

    /// Terminal statuses are excluded from reconciliation. A failed download
    /// already reset its game to wanted; revisiting it later would resurrect
    /// it as completed through the vanished-item heuristic.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

/// The join between a game and an in-flight acquisition at one downloader.
/// Created on successful submission, mutated only by reconciliation, never
/// deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedDownload {
    pub id: String,
    pub game_id: String,
    pub downloader_id: String,
    /// Content hash/id as returned by the downloader at submission time,
    /// lower-cased.
    pub hash: String,
    pub title: String,
    pub status: DownloadStatus,
    pub kind: DownloadKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(NotificationKind::Info),
            "success" => Some(NotificationKind::Success),
            "warning" => Some(NotificationKind::Warning),
            "error" => Some(NotificationKind::Error),
            _ => None,
        }
    }
}

/// A fire-and-forget user-visible event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            user_id: None,
            created_at: Utc::now(),
        }
    }
}
