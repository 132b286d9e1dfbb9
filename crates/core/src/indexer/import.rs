//! Bulk indexer import from an indexer-manager service.
//!
//! Managers like Prowlarr expose their configured indexers over a JSON API.
//! Importing reuses those definitions instead of retyping them; candidates
//! that fail validation are skipped, never repaired or invented.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::ssrf;

use super::{Indexer, IndexerError, IndexerProtocol};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One candidate definition as returned by the manager.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagedIndexer {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Protocol tag, `torznab` or `newznab`.
    pub protocol: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> u8 {
    25
}

/// Client for an indexer-manager's export endpoint.
pub struct IndexerManagerClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl IndexerManagerClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Fetch and validate the manager's indexer definitions.
    pub async fn fetch_indexers(&self) -> Result<Vec<Indexer>, IndexerError> {
        if !ssrf::is_safe_url(&self.base_url).await {
            return Err(IndexerError::UnsafeUrl(self.base_url.clone()));
        }

        let url = format!(
            "{}/api/v1/indexer?apikey={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.api_key)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(IndexerError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(IndexerError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let candidates: Vec<ManagedIndexer> = response
            .json()
            .await
            .map_err(|e| IndexerError::ApiError(format!("Failed to parse response: {}", e)))?;

        let mut imported = Vec::new();
        for candidate in candidates {
            match validate_candidate(&candidate).await {
                Ok(indexer) => imported.push(indexer),
                Err(e) => {
                    warn!(
                        candidate = %candidate.name,
                        error = %e,
                        "Skipping invalid indexer candidate"
                    );
                }
            }
        }

        info!(imported = imported.len(), "Indexer import complete");
        Ok(imported)
    }
}

/// Turn one candidate into a store-ready record.
pub(crate) async fn validate_candidate(candidate: &ManagedIndexer) -> Result<Indexer, IndexerError> {
    let protocol = IndexerProtocol::parse(&candidate.protocol)
        .ok_or_else(|| IndexerError::ApiError(format!("unknown protocol: {}", candidate.protocol)))?;

    if candidate.name.trim().is_empty() {
        return Err(IndexerError::ApiError("empty indexer name".to_string()));
    }

    if !ssrf::is_safe_url(&candidate.url).await {
        return Err(IndexerError::UnsafeUrl(candidate.url.clone()));
    }

    Ok(Indexer {
        id: uuid::Uuid::new_v4().to_string(),
        name: candidate.name.clone(),
        url: candidate.url.clone(),
        api_key: candidate.api_key.clone(),
        protocol,
        enabled: candidate.enabled,
        priority: candidate.priority,
        categories: vec![],
        rss_enabled: true,
        auto_search_enabled: true,
    })
}
