//! Types for the download-client gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur talking to download clients.
#[derive(Debug, Error)]
pub enum DownloaderError {
    #[error("Unsafe URL refused: {0}")]
    UnsafeUrl(String),

    #[error("No adapter registered for client kind: {0}")]
    UnsupportedClient(String),

    #[error("No enabled downloaders available")]
    NoDownloadersAvailable,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

impl DownloaderError {
    /// Classify a reqwest error into the gateway taxonomy.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DownloaderError::Timeout
        } else if e.is_connect() {
            DownloaderError::ConnectionFailed(e.to_string())
        } else {
            DownloaderError::ApiError(e.to_string())
        }
    }
}

/// What a release physically is, and therefore which client family can
/// take it. Derived from the source indexer's protocol, never from the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    Torrent,
    Usenet,
}

impl DownloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadKind::Torrent => "torrent",
            DownloadKind::Usenet => "usenet",
        }
    }
}

/// The closed set of supported client kinds. Declaring a kind here does not
/// imply an adapter exists for it; dispatch of an adapterless kind is a
/// configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloaderKind {
    Transmission,
    QBittorrent,
    RTorrent,
    UTorrent,
    Vuze,
    Sabnzbd,
    Deluge,
}

impl DownloaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloaderKind::Transmission => "transmission",
            DownloaderKind::QBittorrent => "qbittorrent",
            DownloaderKind::RTorrent => "rtorrent",
            DownloaderKind::UTorrent => "utorrent",
            DownloaderKind::Vuze => "vuze",
            DownloaderKind::Sabnzbd => "sabnzbd",
            DownloaderKind::Deluge => "deluge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transmission" => Some(DownloaderKind::Transmission),
            "qbittorrent" => Some(DownloaderKind::QBittorrent),
            "rtorrent" => Some(DownloaderKind::RTorrent),
            "utorrent" => Some(DownloaderKind::UTorrent),
            "vuze" => Some(DownloaderKind::Vuze),
            "sabnzbd" => Some(DownloaderKind::Sabnzbd),
            "deluge" => Some(DownloaderKind::Deluge),
            _ => None,
        }
    }

    /// Which acquisition kind this client family handles.
    pub fn download_kind(&self) -> DownloadKind {
        match self {
            DownloaderKind::Sabnzbd => DownloadKind::Usenet,
            _ => DownloadKind::Torrent,
        }
    }
}

/// A configured download client instance. Identity is immutable; the rest is
/// user configuration owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Downloader {
    pub id: String,
    pub name: String,
    pub kind: DownloaderKind,
    /// Endpoint URL, e.g. "http://192.168.1.10:9091".
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub enabled: bool,
    /// Ascending priority: lower values are attempted first.
    pub priority: u8,
    /// Category/label applied to submitted jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Download directory override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

/// One item to hand to a download client.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Display title, used for labelling and diagnostics.
    pub title: String,
    /// Magnet URI, .torrent URL or NZB URL.
    pub link: String,
    pub kind: DownloadKind,
    pub category: Option<String>,
    pub download_path: Option<String>,
}

impl DownloadJob {
    pub fn new(title: impl Into<String>, link: impl Into<String>, kind: DownloadKind) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            kind,
            category: None,
            download_path: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        self.download_path = Some(path.into());
        self
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Client-native content hash or queue id, lower-cased for matching.
    pub id: String,
}

/// Normalized status vocabulary across all client protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Downloading,
    Seeding,
    Completed,
    Paused,
    Error,
}

impl RemoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::Downloading => "downloading",
            RemoteStatus::Seeding => "seeding",
            RemoteStatus::Completed => "completed",
            RemoteStatus::Paused => "paused",
            RemoteStatus::Error => "error",
        }
    }

    /// Whether this status means the payload is fully on disk.
    pub fn is_complete(&self) -> bool {
        matches!(self, RemoteStatus::Seeding | RemoteStatus::Completed)
    }
}

/// One entry in a client's current job list, normalized. Producing this shape
/// from each client's own status vocabulary and transport is the entire
/// reason the adapters exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDownload {
    /// Client-native hash/identifier, lower-cased.
    pub id: String,
    pub name: String,
    pub status: RemoteStatus,
    /// Progress 0-100.
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Capability interface implemented once per client kind.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// The client kind this adapter speaks for.
    fn kind(&self) -> DownloaderKind;

    /// Submit a job. The returned id is the client-native identifier the
    /// reconciler will later match against `list`.
    async fn submit(
        &self,
        downloader: &Downloader,
        job: &DownloadJob,
    ) -> Result<Submission, DownloaderError>;

    /// List the client's current jobs.
    async fn list(&self, downloader: &Downloader) -> Result<Vec<RemoteDownload>, DownloaderError>;

    /// Remove a job (without deleting data). Returns whether the client
    /// acknowledged the removal.
    async fn remove(&self, downloader: &Downloader, id: &str) -> Result<bool, DownloaderError>;
}

/// Extract the info hash from a magnet URI, lower-cased.
pub(crate) fn extract_hash_from_magnet(magnet: &str) -> Option<String> {
    let query = magnet.split('?').nth(1)?;
    for param in query.split('&') {
        if let Some(value) = param.strip_prefix("xt=urn:btih:") {
            return Some(value.to_lowercase());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downloader_kind_roundtrip() {
        for kind in [
            DownloaderKind::Transmission,
            DownloaderKind::QBittorrent,
            DownloaderKind::RTorrent,
            DownloaderKind::UTorrent,
            DownloaderKind::Vuze,
            DownloaderKind::Sabnzbd,
            DownloaderKind::Deluge,
        ] {
            assert_eq!(DownloaderKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DownloaderKind::parse("floppyd"), None);
    }

    #[test]
    fn test_download_kind_per_client() {
        assert_eq!(
            DownloaderKind::Sabnzbd.download_kind(),
            DownloadKind::Usenet
        );
        assert_eq!(
            DownloaderKind::Transmission.download_kind(),
            DownloadKind::Torrent
        );
        assert_eq!(
            DownloaderKind::Deluge.download_kind(),
            DownloadKind::Torrent
        );
    }

    #[test]
    fn test_remote_status_complete() {
        assert!(RemoteStatus::Seeding.is_complete());
        assert!(RemoteStatus::Completed.is_complete());
        assert!(!RemoteStatus::Downloading.is_complete());
        assert!(!RemoteStatus::Paused.is_complete());
        assert!(!RemoteStatus::Error.is_complete());
    }

    #[test]
    fn test_job_builder() {
        let job = DownloadJob::new("Hollow Depths", "magnet:?xt=urn:btih:abc", DownloadKind::Torrent)
            .with_category("games")
            .with_download_path("/downloads/games");
        assert_eq!(job.category.as_deref(), Some("games"));
        assert_eq!(job.download_path.as_deref(), Some("/downloads/games"));
    }

    #[test]
    fn test_extract_hash_from_magnet() {
        assert_eq!(
            extract_hash_from_magnet("magnet:?xt=urn:btih:ABC123&dn=Test"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_hash_from_magnet("magnet:?dn=Test&xt=urn:btih:def456"),
            Some("def456".to_string())
        );
        assert_eq!(extract_hash_from_magnet("magnet:?dn=Test"), None);
        assert_eq!(extract_hash_from_magnet("http://example.com/file.torrent"), None);
    }
}
