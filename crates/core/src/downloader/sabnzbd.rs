//! SABnzbd REST API adapter — the Usenet side of the gateway.
//!
//! SABnzbd is plain query-string REST with an API key. A job lives in the
//! queue while fetching and moves to the history when it finishes, so `list`
//! merges both views into the normalized shape.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    DownloadClient, DownloadJob, Downloader, DownloaderError, DownloaderKind, RemoteDownload,
    RemoteStatus, Submission,
};

const API_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SabnzbdClient {
    client: Client,
}

impl Default for SabnzbdClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SabnzbdClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    fn api_url(downloader: &Downloader, params: &[(&str, &str)]) -> String {
        let api_key = downloader.api_key.as_deref().unwrap_or("");
        let mut url = format!(
            "{}/api?output=json&apikey={}",
            downloader.url.trim_end_matches('/'),
            urlencoding::encode(api_key)
        );
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        downloader: &Downloader,
        params: &[(&str, &str)],
    ) -> Result<T, DownloaderError> {
        let url = Self::api_url(downloader, params);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(DownloaderError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(DownloaderError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DownloaderError::ApiError(format!("Failed to parse response: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    status: bool,
    #[serde(default)]
    nzo_ids: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: Queue,
}

#[derive(Debug, Deserialize)]
struct Queue {
    #[serde(default)]
    slots: Vec<QueueSlot>,
}

#[derive(Debug, Deserialize)]
struct QueueSlot {
    nzo_id: String,
    filename: String,
    status: String,
    /// Percentage as a string, e.g. "34".
    #[serde(default)]
    percentage: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: History,
}

#[derive(Debug, Deserialize)]
struct History {
    #[serde(default)]
    slots: Vec<HistorySlot>,
}

#[derive(Debug, Deserialize)]
struct HistorySlot {
    nzo_id: String,
    name: String,
    status: String,
    #[serde(default)]
    fail_message: String,
}

fn map_queue_status(status: &str) -> RemoteStatus {
    match status {
        "Paused" => RemoteStatus::Paused,
        "Downloading" | "Queued" | "Grabbing" | "Fetching" | "Checking" | "Verifying"
        | "Repairing" | "Extracting" | "Moving" | "Running" | "Propagating" => {
            RemoteStatus::Downloading
        }
        "Failed" => RemoteStatus::Error,
        _ => RemoteStatus::Downloading,
    }
}

fn map_history_status(status: &str) -> RemoteStatus {
    match status {
        "Completed" => RemoteStatus::Completed,
        "Failed" => RemoteStatus::Error,
        // Post-processing entries still count as in flight.
        _ => RemoteStatus::Downloading,
    }
}

#[async_trait]
impl DownloadClient for SabnzbdClient {
    fn kind(&self) -> DownloaderKind {
        DownloaderKind::Sabnzbd
    }

    async fn submit(
        &self,
        downloader: &Downloader,
        job: &DownloadJob,
    ) -> Result<Submission, DownloaderError> {
        let mut params: Vec<(&str, &str)> = vec![
            ("mode", "addurl"),
            ("name", job.link.as_str()),
            ("nzbname", job.title.as_str()),
        ];
        let category = job.category.as_deref().or(downloader.category.as_deref());
        if let Some(cat) = category {
            params.push(("cat", cat));
        }

        let response: AddResponse = self.get_json(downloader, &params).await?;

        if !response.status {
            return Err(DownloaderError::ApiError(
                response.error.unwrap_or_else(|| "addurl rejected".to_string()),
            ));
        }

        let id = response
            .nzo_ids
            .into_iter()
            .next()
            .map(|id| id.to_lowercase())
            .ok_or_else(|| DownloaderError::ApiError("addurl returned no nzo id".to_string()))?;

        debug!(downloader = %downloader.name, id = %id, "SABnzbd job queued");
        Ok(Submission { id })
    }

    async fn list(&self, downloader: &Downloader) -> Result<Vec<RemoteDownload>, DownloaderError> {
        let queue: QueueResponse = self.get_json(downloader, &[("mode", "queue")]).await?;
        let history: HistoryResponse = self.get_json(downloader, &[("mode", "history")]).await?;

        let mut downloads = Vec::new();

        for slot in queue.queue.slots {
            let status = map_queue_status(&slot.status);
            downloads.push(RemoteDownload {
                id: slot.nzo_id.to_lowercase(),
                name: slot.filename,
                status,
                progress: slot.percentage.parse().unwrap_or(0.0),
                error: None,
            });
        }

        for slot in history.history.slots {
            let status = map_history_status(&slot.status);
            downloads.push(RemoteDownload {
                id: slot.nzo_id.to_lowercase(),
                name: slot.name,
                status,
                progress: if status == RemoteStatus::Completed {
                    100.0
                } else {
                    0.0
                },
                error: if slot.fail_message.is_empty() {
                    None
                } else {
                    Some(slot.fail_message)
                },
            });
        }

        Ok(downloads)
    }

    async fn remove(&self, downloader: &Downloader, id: &str) -> Result<bool, DownloaderError> {
        #[derive(Debug, Deserialize)]
        struct DeleteResponse {
            status: bool,
        }

        let response: DeleteResponse = self
            .get_json(
                downloader,
                &[("mode", "queue"), ("name", "delete"), ("value", id)],
            )
            .await?;
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader() -> Downloader {
        Downloader {
            id: "d1".to_string(),
            name: "SABnzbd".to_string(),
            kind: DownloaderKind::Sabnzbd,
            url: "http://127.0.0.1:8080/sabnzbd/".to_string(),
            username: None,
            password: None,
            api_key: Some("secret".to_string()),
            enabled: true,
            priority: 1,
            category: Some("games".to_string()),
            download_path: None,
        }
    }

    #[test]
    fn test_api_url() {
        let url = SabnzbdClient::api_url(&downloader(), &[("mode", "queue")]);
        assert!(url.starts_with("http://127.0.0.1:8080/sabnzbd/api?output=json&apikey=secret"));
        assert!(url.contains("&mode=queue"));
    }

    #[test]
    fn test_map_queue_status() {
        assert_eq!(map_queue_status("Downloading"), RemoteStatus::Downloading);
        assert_eq!(map_queue_status("Queued"), RemoteStatus::Downloading);
        assert_eq!(map_queue_status("Paused"), RemoteStatus::Paused);
        assert_eq!(map_queue_status("Failed"), RemoteStatus::Error);
        assert_eq!(map_queue_status("Unknown"), RemoteStatus::Downloading);
    }

    #[test]
    fn test_map_history_status() {
        assert_eq!(map_history_status("Completed"), RemoteStatus::Completed);
        assert_eq!(map_history_status("Failed"), RemoteStatus::Error);
        assert_eq!(map_history_status("Verifying"), RemoteStatus::Downloading);
    }

    #[test]
    fn test_add_response_parsing() {
        let ok = r#"{"status": true, "nzo_ids": ["SABnzbd_nzo_p86tgx"]}"#;
        let parsed: AddResponse = serde_json::from_str(ok).unwrap();
        assert!(parsed.status);
        assert_eq!(parsed.nzo_ids.len(), 1);

        let failed = r#"{"status": false, "error": "no api key"}"#;
        let parsed: AddResponse = serde_json::from_str(failed).unwrap();
        assert!(!parsed.status);
        assert_eq!(parsed.error.as_deref(), Some("no api key"));
    }

    #[test]
    fn test_queue_parsing() {
        let body = r#"{"queue": {"slots": [
            {"nzo_id": "SABnzbd_nzo_A", "filename": "game.nzb", "status": "Downloading", "percentage": "34"}
        ]}}"#;
        let parsed: QueueResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.queue.slots.len(), 1);
        assert_eq!(parsed.queue.slots[0].percentage, "34");
    }
}
