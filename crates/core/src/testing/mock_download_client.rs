//! Mock download client for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::downloader::{
    DownloadClient, DownloadJob, Downloader, DownloaderError, DownloaderKind, RemoteDownload,
    Submission,
};

/// A recorded submission for assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub downloader_id: String,
    pub title: String,
    pub link: String,
}

/// Mock implementation of `DownloadClient`.
///
/// Behavior is scripted per downloader id: submissions succeed (with a
/// deterministic id) unless the id is marked failing, and `list` returns
/// whatever was set, or an error when marked failing.
pub struct MockDownloadClient {
    kind: DownloaderKind,
    submissions: Arc<RwLock<Vec<RecordedSubmission>>>,
    failing_submit: Arc<RwLock<HashSet<String>>>,
    failing_list: Arc<RwLock<HashSet<String>>>,
    remote_lists: Arc<RwLock<HashMap<String, Vec<RemoteDownload>>>>,
    removed: Arc<RwLock<Vec<(String, String)>>>,
    counter: Arc<RwLock<u32>>,
}

impl MockDownloadClient {
    pub fn new(kind: DownloaderKind) -> Self {
        Self {
            kind,
            submissions: Arc::new(RwLock::new(Vec::new())),
            failing_submit: Arc::new(RwLock::new(HashSet::new())),
            failing_list: Arc::new(RwLock::new(HashSet::new())),
            remote_lists: Arc::new(RwLock::new(HashMap::new())),
            removed: Arc::new(RwLock::new(Vec::new())),
            counter: Arc::new(RwLock::new(0)),
        }
    }

    /// All recorded submissions, in order.
    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.read().await.clone()
    }

    /// Make submissions to one downloader id fail.
    pub async fn fail_submissions_for(&self, downloader_id: &str) {
        self.failing_submit
            .write()
            .await
            .insert(downloader_id.to_string());
    }

    /// Make list calls for one downloader id fail.
    pub async fn fail_list_for(&self, downloader_id: &str) {
        self.failing_list
            .write()
            .await
            .insert(downloader_id.to_string());
    }

    /// Script the remote job list for one downloader id.
    pub async fn set_remote_list(&self, downloader_id: &str, list: Vec<RemoteDownload>) {
        self.remote_lists
            .write()
            .await
            .insert(downloader_id.to_string(), list);
    }

    /// Recorded (downloader id, job id) removals.
    pub async fn removals(&self) -> Vec<(String, String)> {
        self.removed.read().await.clone()
    }
}

#[async_trait]
impl DownloadClient for MockDownloadClient {
    fn kind(&self) -> DownloaderKind {
        self.kind
    }

    async fn submit(
        &self,
        downloader: &Downloader,
        job: &DownloadJob,
    ) -> Result<Submission, DownloaderError> {
        self.submissions.write().await.push(RecordedSubmission {
            downloader_id: downloader.id.clone(),
            title: job.title.clone(),
            link: job.link.clone(),
        });

        if self.failing_submit.read().await.contains(&downloader.id) {
            return Err(DownloaderError::ConnectionFailed(format!(
                "scripted failure for {}",
                downloader.id
            )));
        }

        let mut counter = self.counter.write().await;
        *counter += 1;
        Ok(Submission {
            id: format!("mockhash{:08x}", *counter),
        })
    }

    async fn list(&self, downloader: &Downloader) -> Result<Vec<RemoteDownload>, DownloaderError> {
        if self.failing_list.read().await.contains(&downloader.id) {
            return Err(DownloaderError::ConnectionFailed(format!(
                "scripted failure for {}",
                downloader.id
            )));
        }
        Ok(self
            .remote_lists
            .read()
            .await
            .get(&downloader.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove(&self, downloader: &Downloader, id: &str) -> Result<bool, DownloaderError> {
        self.removed
            .write()
            .await
            .push((downloader.id.clone(), id.to_string()));
        Ok(true)
    }
}
