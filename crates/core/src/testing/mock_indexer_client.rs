//! Mock indexer client for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::indexer::{
    Category, ConnectionTest, Indexer, IndexerClient, IndexerError, IndexerProtocol, SearchParams,
    SearchResultItem,
};

/// Mock implementation of `IndexerClient`, scripted per indexer id.
pub struct MockIndexerClient {
    protocol: IndexerProtocol,
    results: Arc<RwLock<HashMap<String, Vec<SearchResultItem>>>>,
    failures: Arc<RwLock<HashMap<String, String>>>,
    searches: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockIndexerClient {
    pub fn new(protocol: IndexerProtocol) -> Self {
        Self {
            protocol,
            results: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Script the results one indexer returns.
    pub async fn set_results(&self, indexer_id: &str, results: Vec<SearchResultItem>) {
        self.results
            .write()
            .await
            .insert(indexer_id.to_string(), results);
    }

    /// Make one indexer fail with the given message.
    pub async fn fail(&self, indexer_id: &str, message: &str) {
        self.failures
            .write()
            .await
            .insert(indexer_id.to_string(), message.to_string());
    }

    /// Recorded (indexer id, query) pairs.
    pub async fn searches(&self) -> Vec<(String, String)> {
        self.searches.read().await.clone()
    }
}

#[async_trait]
impl IndexerClient for MockIndexerClient {
    fn protocol(&self) -> IndexerProtocol {
        self.protocol
    }

    async fn search(
        &self,
        indexer: &Indexer,
        params: &SearchParams,
    ) -> Result<Vec<SearchResultItem>, IndexerError> {
        self.searches
            .write()
            .await
            .push((indexer.id.clone(), params.query.clone()));

        if let Some(message) = self.failures.read().await.get(&indexer.id) {
            return Err(IndexerError::ApiError(message.clone()));
        }

        Ok(self
            .results
            .read()
            .await
            .get(&indexer.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn test_connection(&self, indexer: &Indexer) -> Result<ConnectionTest, IndexerError> {
        if let Some(message) = self.failures.read().await.get(&indexer.id) {
            return Ok(ConnectionTest {
                success: false,
                message: message.clone(),
            });
        }
        Ok(ConnectionTest {
            success: true,
            message: "OK".to_string(),
        })
    }

    async fn list_categories(&self, _indexer: &Indexer) -> Result<Vec<Category>, IndexerError> {
        Ok(vec![
            Category {
                id: "1000".to_string(),
                name: "Console".to_string(),
            },
            Category {
                id: "4050".to_string(),
                name: "PC/Games".to_string(),
            },
        ])
    }
}

/// Build a canonical result for tests.
pub fn make_result(title: &str, indexer: &Indexer, seeders: Option<u32>) -> SearchResultItem {
    SearchResultItem {
        title: title.to_string(),
        link: format!("magnet:?xt=urn:btih:{}", title.to_lowercase().replace(' ', "")),
        guid: format!("guid-{}", title),
        publish_date: None,
        size_bytes: Some(1024 * 1024),
        seeders,
        leechers: None,
        grabs: None,
        age_days: None,
        poster: None,
        group: None,
        indexer_id: indexer.id.clone(),
        indexer_name: indexer.name.clone(),
        indexer_url: indexer.url.clone(),
        categories: vec!["4050".to_string()],
        download_kind: indexer.protocol.download_kind(),
    }
}
