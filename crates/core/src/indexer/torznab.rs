//! Torznab protocol client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::ssrf;

use super::categories::resolve_categories;
use super::feed::{parse_caps_categories, parse_feed, FeedItem};
use super::{
    Category, ConnectionTest, Indexer, IndexerClient, IndexerError, IndexerProtocol, SearchParams,
    SearchResultItem,
};

/// Timeout for search and category listing calls.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for lightweight capability probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Torznab client. One instance serves every configured Torznab indexer;
/// per-indexer state lives in the `Indexer` record.
pub struct TorznabClient {
    client: Client,
}

impl Default for TorznabClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TorznabClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    async fn guard(&self, indexer: &Indexer) -> Result<(), IndexerError> {
        if !ssrf::is_safe_url(&indexer.url).await {
            return Err(IndexerError::UnsafeUrl(indexer.url.clone()));
        }
        Ok(())
    }

    fn build_query_url(
        &self,
        indexer: &Indexer,
        extra: &[(&str, String)],
    ) -> Result<String, IndexerError> {
        let base = api_base(&indexer.url)?;
        let mut url = format!("{}?apikey={}", base, urlencoding::encode(&indexer.api_key));
        for (key, value) in extra {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        Ok(url)
    }

    fn item_to_result(&self, item: FeedItem, indexer: &Indexer) -> SearchResultItem {
        let seeders = item.attr_u32("seeders");
        // Torznab reports peers as seeders + leechers.
        let leechers = item
            .attr_u32("peers")
            .map(|peers| peers.saturating_sub(seeders.unwrap_or(0)));

        let link = rewrite_link(&item.link, &indexer.url);
        let mut categories = item.categories.clone();
        if let Some(cat) = item.attrs.get("category") {
            if !categories.contains(cat) {
                categories.push(cat.clone());
            }
        }

        SearchResultItem {
            title: item.title.clone(),
            link,
            guid: item.guid.clone(),
            publish_date: item.publish_date,
            size_bytes: item.attr_u64("size").or(item.enclosure_length),
            seeders,
            leechers,
            grabs: item.attr_u32("grabs"),
            age_days: None,
            poster: None,
            group: None,
            indexer_id: indexer.id.clone(),
            indexer_name: indexer.name.clone(),
            indexer_url: indexer.url.clone(),
            categories,
            download_kind: IndexerProtocol::Torznab.download_kind(),
        }
    }
}

#[async_trait]
impl IndexerClient for TorznabClient {
    fn protocol(&self) -> IndexerProtocol {
        IndexerProtocol::Torznab
    }

    async fn search(
        &self,
        indexer: &Indexer,
        params: &SearchParams,
    ) -> Result<Vec<SearchResultItem>, IndexerError> {
        self.guard(indexer).await?;

        let cats = resolve_categories(params.categories.as_deref(), indexer);
        let mut query: Vec<(&str, String)> = vec![
            ("t", "search".to_string()),
            ("q", params.query.clone()),
            ("cat", cats.join(",")),
        ];
        if let Some(limit) = params.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = params.offset {
            query.push(("offset", offset.to_string()));
        }

        let url = self.build_query_url(indexer, &query)?;
        debug!(indexer = %indexer.name, query = %params.query, "Torznab search");

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

        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::ApiError(e.to_string()))?;

        let items = parse_feed(&body)?;
        debug!(
            indexer = %indexer.name,
            results = items.len(),
            "Torznab search complete"
        );

        Ok(items
            .into_iter()
            .map(|item| self.item_to_result(item, indexer))
            .collect())
    }

    async fn test_connection(&self, indexer: &Indexer) -> Result<ConnectionTest, IndexerError> {
        self.guard(indexer).await?;

        let url = self.build_query_url(indexer, &[("t", "caps".to_string())])?;
        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(IndexerError::from_reqwest)?;

        if !response.status().is_success() {
            return Ok(ConnectionTest {
                success: false,
                message: format!("HTTP {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::ApiError(e.to_string()))?;

        match parse_caps_categories(&body) {
            Ok(cats) => Ok(ConnectionTest {
                success: true,
                message: format!("OK, {} categories advertised", cats.len()),
            }),
            Err(e) => {
                warn!(indexer = %indexer.name, error = %e, "Capability probe failed");
                Ok(ConnectionTest {
                    success: false,
                    message: e.to_string(),
                })
            }
        }
    }

    async fn list_categories(&self, indexer: &Indexer) -> Result<Vec<Category>, IndexerError> {
        self.guard(indexer).await?;

        let url = self.build_query_url(indexer, &[("t", "caps".to_string())])?;
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

        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::ApiError(e.to_string()))?;

        parse_caps_categories(&body)
    }
}

/// Derive the API endpoint from a configured base URL: the `/api` segment is
/// appended when the URL does not already end in one.
pub(crate) fn api_base(base: &str) -> Result<String, IndexerError> {
    let url = Url::parse(base).map_err(|e| IndexerError::InvalidUrl(e.to_string()))?;
    let trimmed = base.trim_end_matches('/');
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    if last_segment == "api" {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/api", trimmed))
    }
}

/// Rewrite an HTTP(S) retrieval link onto the indexer's configured
/// scheme/host/port, keeping the link's own path and query. Feeds served
/// through a reverse proxy or seedbox frequently point at an internal
/// host/port the caller cannot reach. Non-HTTP links (magnets) pass through
/// untouched.
pub(crate) fn rewrite_link(raw: &str, indexer_url: &str) -> String {
    if !raw.starts_with("http://") && !raw.starts_with("https://") {
        return raw.to_string();
    }
    let (Ok(mut link), Ok(configured)) = (Url::parse(raw), Url::parse(indexer_url)) else {
        return raw.to_string();
    };
    let same_host = link.host_str() == configured.host_str()
        && link.port_or_known_default() == configured.port_or_known_default();
    if same_host {
        return raw.to_string();
    }

    let _ = link.set_scheme(configured.scheme());
    let _ = link.set_host(configured.host_str());
    let _ = link.set_port(configured.port());
    link.to_string()
}
