//! Newznab protocol client.
//!
//! Same query shape as Torznab with `extended=1` for the full attribute set.
//! Usenet quality signals replace the swarm ones: grabs, poster, group, and a
//! client-side age in whole days.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

use crate::ssrf;

use super::categories::resolve_categories;
use super::feed::{parse_caps_categories, parse_feed, FeedItem};
use super::torznab::api_base;
use super::{
    Category, ConnectionTest, Indexer, IndexerClient, IndexerError, IndexerProtocol, SearchParams,
    SearchResultItem,
};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Newznab client. One instance serves every configured Newznab indexer.
pub struct NewznabClient {
    client: Client,
}

impl Default for NewznabClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NewznabClient {
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
        // Size comes from the protocol attribute or the enclosure length,
        // whichever parses.
        let size_bytes = item.attr_u64("size").or(item.enclosure_length);
        let age_days = item
            .publish_date
            .map(|published| (Utc::now() - published).num_days());

        SearchResultItem {
            title: item.title.clone(),
            link: item.link.clone(),
            guid: item.guid.clone(),
            publish_date: item.publish_date,
            size_bytes,
            seeders: None,
            leechers: None,
            grabs: item.attr_u32("grabs"),
            age_days,
            poster: item.attrs.get("poster").cloned(),
            group: item.attrs.get("group").cloned(),
            indexer_id: indexer.id.clone(),
            indexer_name: indexer.name.clone(),
            indexer_url: indexer.url.clone(),
            categories: item.categories,
            download_kind: IndexerProtocol::Newznab.download_kind(),
        }
    }
}

#[async_trait]
impl IndexerClient for NewznabClient {
    fn protocol(&self) -> IndexerProtocol {
        IndexerProtocol::Newznab
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
            ("extended", "1".to_string()),
        ];
        if let Some(limit) = params.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = params.offset {
            query.push(("offset", offset.to_string()));
        }

        let url = self.build_query_url(indexer, &query)?;
        debug!(indexer = %indexer.name, query = %params.query, "Newznab search");

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
            "Newznab search complete"
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

        if body.contains("Incorrect user credentials") || body.contains("Invalid API key") {
            return Ok(ConnectionTest {
                success: false,
                message: "Invalid API key".to_string(),
            });
        }

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
