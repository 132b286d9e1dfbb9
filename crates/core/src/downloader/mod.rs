//! Download-client gateway: one capability interface over every supported
//! client protocol.

mod deluge;
mod fallback;
mod qbittorrent;
mod sabnzbd;
mod transmission;
mod types;

use std::collections::HashMap;
use std::sync::Arc;

pub use deluge::DelugeClient;
pub use fallback::{submit_with_fallback, FallbackOutcome};
pub use qbittorrent::QBittorrentClient;
pub use sabnzbd::SabnzbdClient;
pub use transmission::TransmissionClient;
pub use types::*;

use crate::ssrf;

/// Registry of protocol adapters keyed by client kind.
///
/// Kinds declared in `DownloaderKind` without a registered adapter
/// (rTorrent, uTorrent, Vuze) dispatch to `UnsupportedClient` — a
/// configuration error, never a silent no-op. Adding a client kind means one
/// adapter implementation plus one registry entry; callers stay untouched.
pub struct DownloaderGateway {
    clients: HashMap<DownloaderKind, Arc<dyn DownloadClient>>,
}

impl Default for DownloaderGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloaderGateway {
    pub fn new() -> Self {
        let mut clients: HashMap<DownloaderKind, Arc<dyn DownloadClient>> = HashMap::new();
        clients.insert(
            DownloaderKind::Transmission,
            Arc::new(TransmissionClient::new()),
        );
        clients.insert(
            DownloaderKind::QBittorrent,
            Arc::new(QBittorrentClient::new()),
        );
        clients.insert(DownloaderKind::Deluge, Arc::new(DelugeClient::new()));
        clients.insert(DownloaderKind::Sabnzbd, Arc::new(SabnzbdClient::new()));
        Self { clients }
    }

    /// Empty registry, for tests that register only mocks.
    pub fn empty() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Register (or replace) the adapter for a client kind.
    pub fn with_client(mut self, client: Arc<dyn DownloadClient>) -> Self {
        self.clients.insert(client.kind(), client);
        self
    }

    fn client_for(&self, kind: DownloaderKind) -> Result<&Arc<dyn DownloadClient>, DownloaderError> {
        self.clients
            .get(&kind)
            .ok_or_else(|| DownloaderError::UnsupportedClient(kind.as_str().to_string()))
    }

    async fn guard(&self, downloader: &Downloader) -> Result<(), DownloaderError> {
        if !ssrf::is_safe_url(&downloader.url).await {
            return Err(DownloaderError::UnsafeUrl(downloader.url.clone()));
        }
        Ok(())
    }

    /// Submit a job to one downloader.
    pub async fn submit(
        &self,
        downloader: &Downloader,
        job: &DownloadJob,
    ) -> Result<Submission, DownloaderError> {
        let client = self.client_for(downloader.kind)?;
        self.guard(downloader).await?;
        client.submit(downloader, job).await
    }

    /// List one downloader's current jobs.
    pub async fn list(&self, downloader: &Downloader) -> Result<Vec<RemoteDownload>, DownloaderError> {
        let client = self.client_for(downloader.kind)?;
        self.guard(downloader).await?;
        client.list(downloader).await
    }

    /// Remove a job from one downloader.
    pub async fn remove(
        &self,
        downloader: &Downloader,
        id: &str,
    ) -> Result<bool, DownloaderError> {
        let client = self.client_for(downloader.kind)?;
        self.guard(downloader).await?;
        client.remove(downloader, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader(kind: DownloaderKind, url: &str) -> Downloader {
        Downloader {
            id: "d1".to_string(),
            name: "client".to_string(),
            kind,
            url: url.to_string(),
            username: None,
            password: None,
            api_key: None,
            enabled: true,
            priority: 1,
            category: None,
            download_path: None,
        }
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_configuration_error() {
        let gateway = DownloaderGateway::new();
        let rtorrent = downloader(DownloaderKind::RTorrent, "http://127.0.0.1:5000");
        let result = gateway.list(&rtorrent).await;
        assert!(matches!(
            result,
            Err(DownloaderError::UnsupportedClient(kind)) if kind == "rtorrent"
        ));
    }

    #[tokio::test]
    async fn test_unsafe_url_is_configuration_error() {
        let gateway = DownloaderGateway::new();
        let metadata = downloader(DownloaderKind::Transmission, "http://169.254.169.254");
        let result = gateway.list(&metadata).await;
        assert!(matches!(result, Err(DownloaderError::UnsafeUrl(_))));
    }

    #[test]
    fn test_default_registry_covers_implemented_kinds() {
        let gateway = DownloaderGateway::new();
        for kind in [
            DownloaderKind::Transmission,
            DownloaderKind::QBittorrent,
            DownloaderKind::Deluge,
            DownloaderKind::Sabnzbd,
        ] {
            assert!(gateway.client_for(kind).is_ok());
        }
        for kind in [
            DownloaderKind::RTorrent,
            DownloaderKind::UTorrent,
            DownloaderKind::Vuze,
        ] {
            assert!(gateway.client_for(kind).is_err());
        }
    }
}
