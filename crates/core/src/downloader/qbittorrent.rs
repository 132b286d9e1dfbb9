//! qBittorrent WebUI API adapter.
//!
//! Authentication is a form login that sets a session cookie; an expired
//! session answers 403 and is renewed with a single login-and-retry.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    extract_hash_from_magnet, DownloadClient, DownloadJob, Downloader, DownloaderError,
    DownloaderKind, RemoteDownload, RemoteStatus, Submission,
};

const API_TIMEOUT: Duration = Duration::from_secs(30);

pub struct QBittorrentClient {
    client: Client,
    /// Downloader ids with a live session cookie in the jar.
    authenticated: RwLock<HashSet<String>>,
}

impl Default for QBittorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QBittorrentClient {
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

    fn base_url(downloader: &Downloader) -> String {
        downloader.url.trim_end_matches('/').to_string()
    }

    async fn login(&self, downloader: &Downloader) -> Result<(), DownloaderError> {
        let url = format!("{}/api/v2/auth/login", Self::base_url(downloader));
        let params = [
            ("username", downloader.username.as_deref().unwrap_or("")),
            ("password", downloader.password.as_deref().unwrap_or("")),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(DownloaderError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!(downloader = %downloader.name, "qBittorrent login successful");
            self.authenticated
                .write()
                .await
                .insert(downloader.id.clone());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(DownloaderError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(DownloaderError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self, downloader: &Downloader) -> Result<(), DownloaderError> {
        if self.authenticated.read().await.contains(&downloader.id) {
            return Ok(());
        }
        self.login(downloader).await
    }

    /// GET an endpoint, re-authenticating once on 403.
    async fn get(&self, downloader: &Downloader, endpoint: &str) -> Result<String, DownloaderError> {
        self.ensure_authenticated(downloader).await?;
        let url = format!("{}{}", Self::base_url(downloader), endpoint);

        for attempt in 0..2 {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(DownloaderError::from_reqwest)?;

            if response.status().as_u16() == 403 && attempt == 0 {
                warn!(downloader = %downloader.name, "qBittorrent session expired, re-authenticating");
                self.authenticated.write().await.remove(&downloader.id);
                self.login(downloader).await?;
                continue;
            }

            if !response.status().is_success() {
                return Err(DownloaderError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| DownloaderError::ApiError(e.to_string()));
        }

        Err(DownloaderError::AuthenticationFailed(
            "session could not be renewed".to_string(),
        ))
    }

    /// POST a form, re-authenticating once on 403.
    async fn post_form(
        &self,
        downloader: &Downloader,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, DownloaderError> {
        self.ensure_authenticated(downloader).await?;
        let url = format!("{}{}", Self::base_url(downloader), endpoint);

        for attempt in 0..2 {
            let response = self
                .client
                .post(&url)
                .form(params)
                .send()
                .await
                .map_err(DownloaderError::from_reqwest)?;

            if response.status().as_u16() == 403 && attempt == 0 {
                warn!(downloader = %downloader.name, "qBittorrent session expired, re-authenticating");
                self.authenticated.write().await.remove(&downloader.id);
                self.login(downloader).await?;
                continue;
            }

            if !response.status().is_success() {
                return Err(DownloaderError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| DownloaderError::ApiError(e.to_string()));
        }

        Err(DownloaderError::AuthenticationFailed(
            "session could not be renewed".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct QbTorrent {
    hash: String,
    name: String,
    state: String,
    progress: f64,
}

impl QbTorrent {
    fn into_remote(self) -> RemoteDownload {
        let status = map_state(&self.state);
        RemoteDownload {
            id: self.hash.to_lowercase(),
            name: self.name,
            status,
            progress: (self.progress * 100.0).clamp(0.0, 100.0),
            error: if status == RemoteStatus::Error {
                Some(format!("client state: {}", self.state))
            } else {
                None
            },
        }
    }
}

fn map_state(state: &str) -> RemoteStatus {
    match state {
        "downloading" | "forcedDL" | "metaDL" | "allocating" | "checkingDL" | "checkingUP"
        | "checkingResumeData" | "queuedDL" | "queuedUP" | "stalledDL" | "moving" => {
            RemoteStatus::Downloading
        }
        "uploading" | "forcedUP" | "stalledUP" => RemoteStatus::Seeding,
        "pausedDL" | "stoppedDL" => RemoteStatus::Paused,
        "pausedUP" | "stoppedUP" => RemoteStatus::Completed,
        "error" | "missingFiles" => RemoteStatus::Error,
        _ => RemoteStatus::Error,
    }
}

#[async_trait]
impl DownloadClient for QBittorrentClient {
    fn kind(&self) -> DownloaderKind {
        DownloaderKind::QBittorrent
    }

    async fn submit(
        &self,
        downloader: &Downloader,
        job: &DownloadJob,
    ) -> Result<Submission, DownloaderError> {
        let mut params: Vec<(&str, &str)> = vec![("urls", job.link.as_str())];
        let save_path = job
            .download_path
            .as_deref()
            .or(downloader.download_path.as_deref());
        if let Some(path) = save_path {
            params.push(("savepath", path));
        }
        let category = job.category.as_deref().or(downloader.category.as_deref());
        if let Some(cat) = category {
            params.push(("category", cat));
        }

        self.post_form(downloader, "/api/v2/torrents/add", &params)
            .await?;

        // The add endpoint returns no identifier; derive it from the magnet
        // or fall back to the most recently added torrent.
        if let Some(hash) = extract_hash_from_magnet(&job.link) {
            return Ok(Submission { id: hash });
        }

        let body = self
            .get(
                downloader,
                "/api/v2/torrents/info?sort=added_on&reverse=true&limit=1",
            )
            .await?;
        let torrents: Vec<QbTorrent> = serde_json::from_str(&body)
            .map_err(|e| DownloaderError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(Submission {
            id: torrents
                .into_iter()
                .next()
                .map(|t| t.hash.to_lowercase())
                .unwrap_or_default(),
        })
    }

    async fn list(&self, downloader: &Downloader) -> Result<Vec<RemoteDownload>, DownloaderError> {
        let body = self.get(downloader, "/api/v2/torrents/info").await?;
        let torrents: Vec<QbTorrent> = serde_json::from_str(&body)
            .map_err(|e| DownloaderError::ApiError(format!("Failed to parse response: {}", e)))?;
        Ok(torrents.into_iter().map(|t| t.into_remote()).collect())
    }

    async fn remove(&self, downloader: &Downloader, id: &str) -> Result<bool, DownloaderError> {
        let hash = id.to_lowercase();
        self.post_form(
            downloader,
            "/api/v2/torrents/delete",
            &[("hashes", hash.as_str()), ("deleteFiles", "false")],
        )
        .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_state_families() {
        assert_eq!(map_state("downloading"), RemoteStatus::Downloading);
        assert_eq!(map_state("metaDL"), RemoteStatus::Downloading);
        assert_eq!(map_state("stalledDL"), RemoteStatus::Downloading);
        assert_eq!(map_state("uploading"), RemoteStatus::Seeding);
        assert_eq!(map_state("stalledUP"), RemoteStatus::Seeding);
        assert_eq!(map_state("pausedDL"), RemoteStatus::Paused);
        assert_eq!(map_state("pausedUP"), RemoteStatus::Completed);
        assert_eq!(map_state("missingFiles"), RemoteStatus::Error);
        assert_eq!(map_state("somethingNew"), RemoteStatus::Error);
    }

    #[test]
    fn test_into_remote_lowercases_hash() {
        let torrent = QbTorrent {
            hash: "ABCDEF".to_string(),
            name: "t".to_string(),
            state: "downloading".to_string(),
            progress: 0.42,
        };
        let remote = torrent.into_remote();
        assert_eq!(remote.id, "abcdef");
        assert!((remote.progress - 42.0).abs() < 0.01);
        assert!(remote.error.is_none());
    }

    #[test]
    fn test_into_remote_error_state_carries_message() {
        let torrent = QbTorrent {
            hash: "ff".to_string(),
            name: "t".to_string(),
            state: "missingFiles".to_string(),
            progress: 0.9,
        };
        let remote = torrent.into_remote();
        assert_eq!(remote.status, RemoteStatus::Error);
        assert_eq!(remote.error.as_deref(), Some("client state: missingFiles"));
    }
}
