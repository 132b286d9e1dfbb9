//! Types for the indexer search system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::downloader::DownloadKind;

/// Wire protocol spoken by an indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexerProtocol {
    Torznab,
    Newznab,
}

impl IndexerProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexerProtocol::Torznab => "torznab",
            IndexerProtocol::Newznab => "newznab",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "torznab" => Some(IndexerProtocol::Torznab),
            "newznab" => Some(IndexerProtocol::Newznab),
            _ => None,
        }
    }

    /// The acquisition kind of everything this protocol serves. Results carry
    /// this value; it is never guessed from the retrieval link.
    pub fn download_kind(&self) -> DownloadKind {
        match self {
            IndexerProtocol::Torznab => DownloadKind::Torrent,
            IndexerProtocol::Newznab => DownloadKind::Usenet,
        }
    }
}

/// A configured indexer. Identity is immutable; configuration fields are
/// owned by the store and only read here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indexer {
    pub id: String,
    pub name: String,
    /// Base URL, e.g. "http://192.168.1.20:9117/torznab/indexer".
    pub url: String,
    pub api_key: String,
    pub protocol: IndexerProtocol,
    pub enabled: bool,
    /// Lower = preferred. Only a tie-break hint, never a filter.
    pub priority: u8,
    /// Opaque category codes configured for this indexer.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_true")]
    pub rss_enabled: bool,
    #[serde(default = "default_true")]
    pub auto_search_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Query parameters for a search.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: String,
    /// Explicit category codes; when absent the per-indexer policy applies.
    pub categories: Option<Vec<String>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// One canonical search result. Ephemeral: never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    /// Magnet URI, .torrent URL or NZB URL. Empty when the feed omitted it.
    pub link: String,
    /// Feed guid; degrades to empty string when absent.
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Torrent-style quality signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeders: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leechers: Option<u32>,
    /// Usenet-style quality signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grabs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Source indexer identity, kept so links can be reconstructed even when
    /// the feed carried no comments/details URL.
    pub indexer_id: String,
    pub indexer_name: String,
    pub indexer_url: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub download_kind: DownloadKind,
}

impl SearchResultItem {
    /// Protocol-appropriate rank: seeders for torrent results, grabs for
    /// Usenet results. Higher is better.
    pub fn rank(&self) -> u32 {
        match self.download_kind {
            DownloadKind::Torrent => self.seeders.unwrap_or(0),
            DownloadKind::Usenet => self.grabs.unwrap_or(0),
        }
    }
}

/// Outcome of a connection test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

/// One category advertised by an indexer's capability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Errors that can occur during indexer operations.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Unsafe URL refused: {0}")]
    UnsafeUrl(String),

    #[error("Invalid indexer URL: {0}")]
    InvalidUrl(String),

    #[error("No enabled indexers available")]
    NoIndexersAvailable,

    #[error("Indexer not found: {0}")]
    IndexerNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("Request timeout")]
    Timeout,
}

impl IndexerError {
    /// Classify a reqwest error into the indexer taxonomy.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IndexerError::Timeout
        } else if e.is_connect() {
            IndexerError::ConnectionFailed(e.to_string())
        } else {
            IndexerError::ApiError(e.to_string())
        }
    }
}

/// Trait implemented once per wire protocol.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// Which protocol this client speaks.
    fn protocol(&self) -> IndexerProtocol;

    /// Run a search against one indexer.
    async fn search(
        &self,
        indexer: &Indexer,
        params: &SearchParams,
    ) -> Result<Vec<SearchResultItem>, IndexerError>;

    /// Probe reachability and credentials.
    async fn test_connection(&self, indexer: &Indexer) -> Result<ConnectionTest, IndexerError>;

    /// Fetch the indexer's advertised category tree.
    async fn list_categories(&self, indexer: &Indexer) -> Result<Vec<Category>, IndexerError>;
}
