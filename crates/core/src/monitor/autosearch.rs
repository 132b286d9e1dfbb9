//! Automatic search for wanted games.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::downloader::{
    submit_with_fallback, DownloadJob, DownloaderError, DownloaderGateway, FallbackOutcome,
};
use crate::indexer::{IndexerError, SearchAggregator, SearchResultItem};
use crate::scheduler::PeriodicTask;
use crate::store::{
    DownloadStatus, Game, GameStatus, Notification, NotificationKind, Store, StoreError,
    TrackedDownload,
};

/// Results fetched per auto-search query.
const AUTO_SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum GrabError {
    #[error("search error: {0}")]
    Indexer(#[from] IndexerError),

    #[error("downloader error: {0}")]
    Downloader(#[from] DownloaderError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("no usable results for \"{0}\"")]
    NoResults(String),
}

/// Per-user auto-search cooldown state.
///
/// Process-lifetime only: a restart starts cold. Consulted by the manual
/// trigger policy; the periodic sweep does not use it.
#[derive(Default)]
pub struct AutoSearchState {
    last_search: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AutoSearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `user_id` may trigger an auto-search now; records the trigger
    /// time when allowed.
    pub fn should_run(&self, user_id: &str, cooldown: Duration) -> bool {
        let mut last = self.last_search.lock().unwrap();
        let now = Utc::now();
        if let Some(previous) = last.get(user_id) {
            let elapsed = now.signed_duration_since(*previous);
            let cooldown =
                chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::zero());
            if elapsed < cooldown {
                return false;
            }
        }
        last.insert(user_id.to_string(), now);
        true
    }
}

/// Searches wanted games and hands the best release to the fallback path.
pub struct AutoSearch {
    store: Arc<dyn Store>,
    aggregator: Arc<SearchAggregator>,
    gateway: Arc<DownloaderGateway>,
}

impl AutoSearch {
    pub fn new(
        store: Arc<dyn Store>,
        aggregator: Arc<SearchAggregator>,
        gateway: Arc<DownloaderGateway>,
    ) -> Self {
        Self {
            store,
            aggregator,
            gateway,
        }
    }

    /// Search for one game and submit the top-ranked usable result.
    pub async fn grab_game(&self, game: &Game) -> Result<FallbackOutcome, GrabError> {
        let search = self
            .aggregator
            .search_all(&game.title, Some(AUTO_SEARCH_LIMIT), None)
            .await?;

        let Some(item) = pick_candidate(&search.items) else {
            return Err(GrabError::NoResults(game.title.clone()));
        };

        // No explicit category or path: each downloader's configured
        // defaults apply at submission.
        let job = DownloadJob::new(item.title.clone(), item.link.clone(), item.download_kind);

        let downloaders = self.store.list_downloaders()?;
        let outcome = submit_with_fallback(&self.gateway, &downloaders, &job).await?;

        if outcome.success {
            let now = Utc::now();
            let tracked = TrackedDownload {
                id: uuid::Uuid::new_v4().to_string(),
                game_id: game.id.clone(),
                downloader_id: outcome.downloader_id.clone().unwrap_or_default(),
                hash: outcome.id.clone().unwrap_or_default().to_lowercase(),
                title: item.title.clone(),
                status: DownloadStatus::Downloading,
                kind: item.download_kind,
                created_at: now,
                updated_at: now,
            };
            self.store.create_tracked(&tracked)?;
            self.store
                .set_game_status(&game.id, GameStatus::Downloading)?;
            self.store.append_notification(&Notification::new(
                NotificationKind::Info,
                "Download started",
                format!("Grabbed \"{}\" for {}", item.title, game.title),
            ))?;
            info!(game = %game.title, release = %item.title, "Auto-search grabbed a release");
        } else {
            warn!(
                game = %game.title,
                attempted = ?outcome.attempted,
                "No downloader accepted the release"
            );
        }

        Ok(outcome)
    }

    /// One sweep: try every wanted game, isolating per-game failures.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let wanted = self.store.wanted_games()?;
        if wanted.is_empty() {
            debug!("No wanted games");
            return Ok(0);
        }

        let mut grabbed = 0;
        for game in wanted {
            match self.grab_game(&game).await {
                Ok(outcome) if outcome.success => grabbed += 1,
                Ok(_) => {}
                Err(GrabError::NoResults(title)) => {
                    debug!(game = %title, "Auto-search found nothing");
                }
                Err(e) => {
                    warn!(game = %game.title, error = %e, "Auto-search failed");
                }
            }
        }
        Ok(grabbed)
    }
}

/// The items are already rank-sorted; take the first with a usable link.
fn pick_candidate(items: &[SearchResultItem]) -> Option<&SearchResultItem> {
    items.iter().find(|item| !item.link.is_empty())
}

#[async_trait]
impl PeriodicTask for AutoSearch {
    fn name(&self) -> &str {
        "autosearch"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let grabbed = self.sweep().await?;
        if grabbed > 0 {
            info!(grabbed, "Auto-search sweep complete");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::DownloadKind;

    fn item(title: &str, link: &str) -> SearchResultItem {
        SearchResultItem {
            title: title.to_string(),
            link: link.to_string(),
            guid: String::new(),
            publish_date: None,
            size_bytes: None,
            seeders: Some(1),
            leechers: None,
            grabs: None,
            age_days: None,
            poster: None,
            group: None,
            indexer_id: "i1".to_string(),
            indexer_name: "one".to_string(),
            indexer_url: String::new(),
            categories: vec![],
            download_kind: DownloadKind::Torrent,
        }
    }

    #[test]
    fn test_pick_candidate_skips_linkless_items() {
        let items = vec![item("no link", ""), item("good", "magnet:?xt=urn:btih:a")];
        assert_eq!(pick_candidate(&items).unwrap().title, "good");
        assert!(pick_candidate(&[]).is_none());
        assert!(pick_candidate(&[item("none", "")]).is_none());
    }

    #[test]
    fn test_cooldown_gates_repeat_triggers() {
        let state = AutoSearchState::new();
        let cooldown = Duration::from_secs(3600);

        assert!(state.should_run("user-1", cooldown));
        assert!(!state.should_run("user-1", cooldown));
        // Other users are unaffected.
        assert!(state.should_run("user-2", cooldown));
    }

    #[test]
    fn test_zero_cooldown_always_runs() {
        let state = AutoSearchState::new();
        assert!(state.should_run("user-1", Duration::ZERO));
        assert!(state.should_run("user-1", Duration::ZERO));
    }
}
