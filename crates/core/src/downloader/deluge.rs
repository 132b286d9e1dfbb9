//! Deluge web API adapter.
//!
//! Deluge's web UI exposes JSON-RPC over a single `/json` endpoint with a
//! cookie session established through `auth.login`. RPC errors come back in
//! the envelope's `error` field with HTTP 200.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    extract_hash_from_magnet, DownloadClient, DownloadJob, Downloader, DownloaderError,
    DownloaderKind, RemoteDownload, RemoteStatus, Submission,
};

const API_TIMEOUT: Duration = Duration::from_secs(30);
/// Deluge error code for a missing/expired session.
const NOT_AUTHENTICATED: i64 = 1;

pub struct DelugeClient {
    client: Client,
    authenticated: RwLock<HashSet<String>>,
}

impl Default for DelugeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DelugeClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            authenticated: RwLock::new(HashSet::new()),
        }
    }

    fn json_url(downloader: &Downloader) -> String {
        format!("{}/json", downloader.url.trim_end_matches('/'))
    }

    async fn login(&self, downloader: &Downloader) -> Result<(), DownloaderError> {
        let password = downloader.password.as_deref().unwrap_or("");
        let result = self
            .call_raw(downloader, "auth.login", json!([password]))
            .await?;

        if result.as_bool() == Some(true) {
            debug!(downloader = %downloader.name, "Deluge login successful");
            self.authenticated
                .write()
                .await
                .insert(downloader.id.clone());
            Ok(())
        } else {
            Err(DownloaderError::AuthenticationFailed(
                "Invalid password".to_string(),
            ))
        }
    }

    /// One RPC call without session handling.
    async fn call_raw(
        &self,
        downloader: &Downloader,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, DownloaderError> {
        let body = json!({ "method": method, "params": params, "id": 1 });
        let response = self
            .client
            .post(Self::json_url(downloader))
            .json(&body)
            .send()
            .await
            .map_err(DownloaderError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(DownloaderError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| DownloaderError::ApiError(e.to_string()))?;

        if let Some(error) = envelope.error {
            if error.code == NOT_AUTHENTICATED {
                return Err(DownloaderError::AuthenticationFailed(error.message));
            }
            return Err(DownloaderError::ApiError(error.message));
        }

        Ok(envelope.result.unwrap_or(serde_json::Value::Null))
    }

    /// One RPC call, logging in first (or again after an expired session).
    async fn call(
        &self,
        downloader: &Downloader,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, DownloaderError> {
        if !self.authenticated.read().await.contains(&downloader.id) {
            self.login(downloader).await?;
        }

        match self.call_raw(downloader, method, params.clone()).await {
            Err(DownloaderError::AuthenticationFailed(_)) => {
                warn!(downloader = %downloader.name, "Deluge session expired, re-authenticating");
                self.authenticated.write().await.remove(&downloader.id);
                self.login(downloader).await?;
                self.call_raw(downloader, method, params).await
            }
            other => other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
    code: i64,
}

#[derive(Debug, Deserialize)]
struct DelugeTorrent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
    /// Deluge reports progress already on a 0-100 scale.
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    message: Option<String>,
}

fn map_state(state: &str) -> RemoteStatus {
    match state {
        "Downloading" | "Checking" | "Queued" | "Allocating" | "Moving" => {
            RemoteStatus::Downloading
        }
        "Seeding" => RemoteStatus::Seeding,
        "Paused" => RemoteStatus::Paused,
        "Error" => RemoteStatus::Error,
        _ => RemoteStatus::Error,
    }
}

#[async_trait]
impl DownloadClient for DelugeClient {
    fn kind(&self) -> DownloaderKind {
        DownloaderKind::Deluge
    }

    async fn submit(
        &self,
        downloader: &Downloader,
        job: &DownloadJob,
    ) -> Result<Submission, DownloaderError> {
        let mut options = json!({});
        if let Some(path) = job.download_path.as_ref().or(downloader.download_path.as_ref()) {
            options["download_location"] = json!(path);
        }

        let (method, params) = if job.link.starts_with("magnet:") {
            ("core.add_torrent_magnet", json!([job.link, options]))
        } else {
            ("core.add_torrent_url", json!([job.link, options]))
        };

        let result = self.call(downloader, method, params).await?;

        let id = result
            .as_str()
            .map(|s| s.to_lowercase())
            .or_else(|| extract_hash_from_magnet(&job.link))
            .unwrap_or_default();

        if id.is_empty() {
            return Err(DownloaderError::ApiError(
                "add returned no torrent id".to_string(),
            ));
        }

        Ok(Submission { id })
    }

    async fn list(&self, downloader: &Downloader) -> Result<Vec<RemoteDownload>, DownloaderError> {
        let params = json!([{}, ["name", "state", "progress", "message"]]);
        let result = self
            .call(downloader, "core.get_torrents_status", params)
            .await?;

        let torrents: HashMap<String, DelugeTorrent> = serde_json::from_value(result)
            .map_err(|e| DownloaderError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(torrents
            .into_iter()
            .map(|(hash, torrent)| {
                let status = map_state(&torrent.state);
                RemoteDownload {
                    id: hash.to_lowercase(),
                    name: torrent.name,
                    status,
                    progress: torrent.progress.clamp(0.0, 100.0),
                    error: if status == RemoteStatus::Error {
                        torrent.message
                    } else {
                        None
                    },
                }
            })
            .collect())
    }

    async fn remove(&self, downloader: &Downloader, id: &str) -> Result<bool, DownloaderError> {
        let result = self
            .call(
                downloader,
                "core.remove_torrent",
                json!([id.to_lowercase(), false]),
            )
            .await?;
        Ok(result.as_bool().unwrap_or(true))
    }
}
