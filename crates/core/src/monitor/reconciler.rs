//! Download reconciliation.
//!
//! One cycle polls every downloader that owns active tracked downloads and
//! drives the per-item status state machine from what the client reports.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::downloader::{DownloaderGateway, RemoteDownload, RemoteStatus};
use crate::metrics;
use crate::scheduler::PeriodicTask;
use crate::store::{
    DownloadStatus, GameStatus, Notification, NotificationKind, Store, StoreError, TrackedDownload,
};

/// Counters from one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Downloader groups visited.
    pub groups: usize,
    /// Groups skipped because the downloader was disabled, missing, or
    /// unreachable.
    pub skipped_groups: usize,
    pub completed: usize,
    pub failed: usize,
    /// Completions assumed because the item vanished from the client.
    pub vanished: usize,
}

/// Polls downloaders and reconciles tracked download state.
pub struct Reconciler {
    store: Arc<dyn Store>,
    gateway: Arc<DownloaderGateway>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<DownloaderGateway>) -> Self {
        Self { store, gateway }
    }

    /// Run one cycle. Only a store failure on the initial load is a hard
    /// error; everything per-downloader is isolated and logged.
    pub async fn run_cycle(&self) -> Result<ReconcileSummary, StoreError> {
        let active = self.store.active_tracked()?;
        let mut summary = ReconcileSummary::default();

        if active.is_empty() {
            debug!("No active downloads to reconcile");
            metrics::RECONCILE_CYCLES.inc();
            return Ok(summary);
        }

        let mut groups: BTreeMap<String, Vec<TrackedDownload>> = BTreeMap::new();
        for download in active {
            groups
                .entry(download.downloader_id.clone())
                .or_default()
                .push(download);
        }

        for (downloader_id, downloads) in groups {
            summary.groups += 1;

            let downloader = match self.store.get_downloader(&downloader_id)? {
                Some(d) if d.enabled => d,
                Some(_) => {
                    debug!(downloader_id = %downloader_id, "Skipping disabled downloader");
                    summary.skipped_groups += 1;
                    continue;
                }
                None => {
                    warn!(downloader_id = %downloader_id, "Tracked downloads reference missing downloader");
                    summary.skipped_groups += 1;
                    continue;
                }
            };

            let remote = match self.gateway.list(&downloader).await {
                Ok(list) => list,
                Err(e) => {
                    // One unreachable client must not stall the others.
                    warn!(downloader = %downloader.name, error = %e, "Failed to poll downloader");
                    summary.skipped_groups += 1;
                    continue;
                }
            };

            let lookup: HashMap<String, RemoteDownload> = remote
                .into_iter()
                .map(|r| (r.id.to_lowercase(), r))
                .collect();

            for tracked in downloads {
                match lookup.get(&tracked.hash.to_lowercase()) {
                    Some(remote) if remote.status.is_complete() || remote.progress >= 100.0 => {
                        self.complete(&tracked, &mut summary, None)?;
                    }
                    Some(remote) => {
                        self.apply_remote_status(&tracked, remote, &mut summary)?;
                    }
                    None => {
                        // The item may have been removed by hand, completed
                        // and pruned, or lost to a client restart. Assuming
                        // completion is a guess, so say so to the user.
                        let note = format!(
                            "\"{}\" is no longer in {}'s queue. It may have been removed manually, \
                             completed and pruned, or lost to a client restart; assuming it completed.",
                            tracked.title, downloader.name
                        );
                        self.complete(&tracked, &mut summary, Some(note))?;
                        summary.vanished += 1;
                    }
                }
            }
        }

        metrics::RECONCILE_CYCLES.inc();
        info!(
            groups = summary.groups,
            completed = summary.completed,
            failed = summary.failed,
            vanished = summary.vanished,
            skipped = summary.skipped_groups,
            "Reconcile cycle complete"
        );
        Ok(summary)
    }

    /// Mark a download completed and its game owned. When `ambiguity_note`
    /// is set the completion was assumed, and the notification says so.
    fn complete(
        &self,
        tracked: &TrackedDownload,
        summary: &mut ReconcileSummary,
        ambiguity_note: Option<String>,
    ) -> Result<(), StoreError> {
        self.store
            .set_tracked_status(&tracked.id, DownloadStatus::Completed)?;
        self.store
            .set_game_status(&tracked.game_id, GameStatus::Owned)?;
        metrics::DOWNLOAD_TRANSITIONS
            .with_label_values(&["completed"])
            .inc();
        summary.completed += 1;

        let notification = match ambiguity_note {
            Some(note) => Notification::new(NotificationKind::Info, "Download assumed complete", note),
            None => Notification::new(
                NotificationKind::Success,
                "Download complete",
                format!("\"{}\" finished downloading", tracked.title),
            ),
        };
        self.store.append_notification(&notification)?;

        info!(title = %tracked.title, game_id = %tracked.game_id, "Download completed");
        Ok(())
    }

    /// Map a non-complete remote status onto the tracked download, writing
    /// only when something actually changed.
    fn apply_remote_status(
        &self,
        tracked: &TrackedDownload,
        remote: &RemoteDownload,
        summary: &mut ReconcileSummary,
    ) -> Result<(), StoreError> {
        let next = match remote.status {
            RemoteStatus::Error => DownloadStatus::Failed,
            RemoteStatus::Paused => DownloadStatus::Paused,
            RemoteStatus::Downloading => DownloadStatus::Downloading,
            // Complete statuses are handled by the caller.
            RemoteStatus::Seeding | RemoteStatus::Completed => DownloadStatus::Downloading,
        };

        if next == tracked.status {
            return Ok(());
        }

        self.store.set_tracked_status(&tracked.id, next)?;
        metrics::DOWNLOAD_TRANSITIONS
            .with_label_values(&[next.as_str()])
            .inc();

        if next == DownloadStatus::Failed {
            self.store
                .set_game_status(&tracked.game_id, GameStatus::Wanted)?;
            summary.failed += 1;

            let reason = remote
                .error
                .clone()
                .unwrap_or_else(|| "client reported an error".to_string());
            self.store.append_notification(&Notification::new(
                NotificationKind::Warning,
                "Download failed",
                format!("\"{}\" failed: {}", tracked.title, reason),
            ))?;
            warn!(title = %tracked.title, reason = %reason, "Download failed");
        }

        Ok(())
    }
}

#[async_trait]
impl PeriodicTask for Reconciler {
    fn name(&self) -> &str {
        "reconciler"
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.run_cycle().await?;
        Ok(())
    }
}
