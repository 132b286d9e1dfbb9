//! Priority-ordered submission fallback.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics;

use super::{DownloadJob, Downloader, DownloaderError, DownloaderGateway};

/// Outcome of a fallback submission run. `attempted` lists every downloader
/// tried, in order, regardless of how each attempt ended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloader_id: Option<String>,
    pub attempted: Vec<String>,
}

/// Offer a job to downloaders in ascending priority order until one accepts.
///
/// Candidates are first filtered to enabled downloaders whose client family
/// matches the job's acquisition kind: a Usenet job is never offered to a
/// torrent client and vice versa. That filter is a precondition of
/// submission, not an optimization. The run is strictly sequential and stops
/// at the first success so the same job is never submitted twice.
///
/// No enabled downloaders at all is a hard error. A filter that leaves no
/// compatible candidate, or a run where every attempt fails, returns a
/// structured `success: false` outcome with the attempt list for diagnostics.
pub async fn submit_with_fallback(
    gateway: &DownloaderGateway,
    downloaders: &[Downloader],
    job: &DownloadJob,
) -> Result<FallbackOutcome, DownloaderError> {
    let enabled: Vec<&Downloader> = downloaders.iter().filter(|d| d.enabled).collect();
    if enabled.is_empty() {
        return Err(DownloaderError::NoDownloadersAvailable);
    }

    let mut candidates: Vec<&Downloader> = enabled
        .into_iter()
        .filter(|d| d.kind.download_kind() == job.kind)
        .collect();
    candidates.sort_by_key(|d| d.priority);

    let mut attempted = Vec::new();
    for downloader in candidates {
        attempted.push(downloader.name.clone());
        metrics::SUBMIT_ATTEMPTS
            .with_label_values(&[downloader.kind.as_str()])
            .inc();

        match gateway.submit(downloader, job).await {
            Ok(submission) => {
                info!(
                    downloader = %downloader.name,
                    id = %submission.id,
                    title = %job.title,
                    "Download submitted"
                );
                return Ok(FallbackOutcome {
                    success: true,
                    id: Some(submission.id),
                    downloader_id: Some(downloader.id.clone()),
                    attempted,
                });
            }
            Err(e) => {
                warn!(
                    downloader = %downloader.name,
                    error = %e,
                    title = %job.title,
                    "Submission failed, trying next downloader"
                );
            }
        }
    }

    Ok(FallbackOutcome {
        success: false,
        id: None,
        downloader_id: None,
        attempted,
    })
}
