//! Transmission RPC adapter.
//!
//! Transmission speaks a JSON envelope over a single RPC endpoint guarded by
//! a CSRF session header: the first call returns 409 with an
//! `X-Transmission-Session-Id` to replay. The handshake is handled here and
//! never surfaces to callers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    extract_hash_from_magnet, DownloadClient, DownloadJob, Downloader, DownloaderError,
    DownloaderKind, RemoteDownload, RemoteStatus, Submission,
};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TransmissionClient {
    client: Client,
    /// Session ids keyed by downloader id; refreshed on 409.
    sessions: RwLock<HashMap<String, String>>,
}

impl Default for TransmissionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmissionClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn rpc_url(downloader: &Downloader) -> String {
        let base = downloader.url.trim_end_matches('/');
        if base.ends_with("/rpc") {
            base.to_string()
        } else {
            format!("{}/transmission/rpc", base)
        }
    }

    /// Issue one RPC call, transparently replaying the 409 session handshake.
    async fn call(
        &self,
        downloader: &Downloader,
        method: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, DownloaderError> {
        let url = Self::rpc_url(downloader);
        let body = json!({ "method": method, "arguments": arguments });

        let mut session = {
            let sessions = self.sessions.read().await;
            sessions.get(&downloader.id).cloned()
        };

        for _ in 0..2 {
            let mut request = self.client.post(&url).json(&body);
            if let Some(ref id) = session {
                request = request.header(SESSION_HEADER, id);
            }
            if let Some(ref username) = downloader.username {
                request = request.basic_auth(username, downloader.password.as_deref());
            }

            let response = request.send().await.map_err(DownloaderError::from_reqwest)?;

            if response.status() == StatusCode::CONFLICT {
                let new_id = response
                    .headers()
                    .get(SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
                    .ok_or_else(|| {
                        DownloaderError::ApiError("409 without session id header".to_string())
                    })?;
                debug!(downloader = %downloader.name, "Transmission session established");
                self.sessions
                    .write()
                    .await
                    .insert(downloader.id.clone(), new_id.clone());
                session = Some(new_id);
                continue;
            }

            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(DownloaderError::AuthenticationFailed(
                    "Invalid credentials".to_string(),
                ));
            }

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

            if envelope.result != "success" {
                return Err(DownloaderError::ApiError(envelope.result));
            }

            return Ok(envelope.arguments.unwrap_or_default());
        }

        Err(DownloaderError::ApiError(
            "session handshake did not converge".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: String,
    arguments: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AddedTorrent {
    #[serde(rename = "hashString")]
    hash_string: String,
}

#[derive(Debug, Deserialize)]
struct TransmissionTorrent {
    #[serde(rename = "hashString")]
    hash_string: String,
    name: String,
    status: i64,
    #[serde(rename = "percentDone")]
    percent_done: f64,
    #[serde(rename = "errorString", default)]
    error_string: String,
    #[serde(rename = "isFinished", default)]
    is_finished: bool,
}

impl TransmissionTorrent {
    fn into_remote(self) -> RemoteDownload {
        let progress = (self.percent_done * 100.0).clamp(0.0, 100.0);
        let status = if !self.error_string.is_empty() {
            RemoteStatus::Error
        } else {
            map_status(self.status, self.percent_done, self.is_finished)
        };
        RemoteDownload {
            id: self.hash_string.to_lowercase(),
            name: self.name,
            status,
            progress,
            error: if self.error_string.is_empty() {
                None
            } else {
                Some(self.error_string)
            },
        }
    }
}

/// Transmission status codes: 0 stopped, 1/2 verify, 3/4 download, 5/6 seed.
fn map_status(status: i64, percent_done: f64, is_finished: bool) -> RemoteStatus {
    match status {
        0 => {
            if is_finished || percent_done >= 1.0 {
                RemoteStatus::Completed
            } else {
                RemoteStatus::Paused
            }
        }
        1 | 2 | 3 | 4 => RemoteStatus::Downloading,
        5 | 6 => RemoteStatus::Seeding,
        _ => RemoteStatus::Error,
    }
}

#[async_trait]
impl DownloadClient for TransmissionClient {
    fn kind(&self) -> DownloaderKind {
        DownloaderKind::Transmission
    }

    async fn submit(
        &self,
        downloader: &Downloader,
        job: &DownloadJob,
    ) -> Result<Submission, DownloaderError> {
        let mut arguments = json!({ "filename": job.link });
        if let Some(path) = job.download_path.as_ref().or(downloader.download_path.as_ref()) {
            arguments["download-dir"] = json!(path);
        }
        if let Some(category) = job.category.as_ref().or(downloader.category.as_ref()) {
            arguments["labels"] = json!([category]);
        }

        let result = self.call(downloader, "torrent-add", arguments).await?;

        let added = result
            .get("torrent-added")
            .or_else(|| result.get("torrent-duplicate"))
            .cloned()
            .ok_or_else(|| {
                DownloaderError::ApiError("torrent-add returned no torrent".to_string())
            })?;

        let added: AddedTorrent = serde_json::from_value(added)
            .map_err(|e| DownloaderError::ApiError(e.to_string()))?;

        let id = if added.hash_string.is_empty() {
            extract_hash_from_magnet(&job.link).unwrap_or_default()
        } else {
            added.hash_string.to_lowercase()
        };

        Ok(Submission { id })
    }

    async fn list(&self, downloader: &Downloader) -> Result<Vec<RemoteDownload>, DownloaderError> {
        let arguments = json!({
            "fields": ["hashString", "name", "status", "percentDone", "errorString", "isFinished"]
        });
        let result = self.call(downloader, "torrent-get", arguments).await?;

        let torrents: Vec<TransmissionTorrent> = result
            .get("torrents")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| DownloaderError::ApiError(e.to_string()))?
            .unwrap_or_default();

        Ok(torrents.into_iter().map(|t| t.into_remote()).collect())
    }

    async fn remove(&self, downloader: &Downloader, id: &str) -> Result<bool, DownloaderError> {
        let arguments = json!({ "ids": [id], "delete-local-data": false });
        self.call(downloader, "torrent-remove", arguments).await?;
        Ok(true)
    }
}
