//! Fan-out search across every enabled indexer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::metrics;
use crate::store::IndexerStore;

use super::{
    IndexerClient, IndexerError, IndexerProtocol, NewznabClient, SearchParams, SearchResultItem,
    TorznabClient,
};

/// Merged outcome of one aggregate search. Partial failure is normal: items
/// and errors coexist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedSearch {
    pub items: Vec<SearchResultItem>,
    /// One entry per failed indexer, naming it and the reason.
    pub errors: Vec<String>,
}

/// Dispatches searches to the protocol clients and merges the results.
pub struct SearchAggregator {
    store: Arc<dyn IndexerStore>,
    clients: HashMap<IndexerProtocol, Arc<dyn IndexerClient>>,
}

impl SearchAggregator {
    pub fn new(store: Arc<dyn IndexerStore>) -> Self {
        let mut clients: HashMap<IndexerProtocol, Arc<dyn IndexerClient>> = HashMap::new();
        clients.insert(IndexerProtocol::Torznab, Arc::new(TorznabClient::new()));
        clients.insert(IndexerProtocol::Newznab, Arc::new(NewznabClient::new()));
        Self { store, clients }
    }

    /// Replace a protocol client. Used by tests to script indexer behavior.
    pub fn with_client(mut self, client: Arc<dyn IndexerClient>) -> Self {
        self.clients.insert(client.protocol(), client);
        self
    }

    /// The protocol client for one indexer record.
    pub fn client_for(&self, protocol: IndexerProtocol) -> Arc<dyn IndexerClient> {
        // Both protocols are always registered; the map exists so tests can
        // swap implementations.
        Arc::clone(
            self.clients
                .get(&protocol)
                .expect("protocol client registered"),
        )
    }

    /// Search every enabled indexer concurrently and merge the outcomes.
    ///
    /// An empty enabled-indexer set is a hard error: callers must be able to
    /// tell "nothing configured" apart from "nothing found".
    pub async fn search_all(
        &self,
        query: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<AggregatedSearch, IndexerError> {
        let indexers = self
            .store
            .enabled_indexers()
            .map_err(|e| IndexerError::ApiError(e.to_string()))?;

        if indexers.is_empty() {
            return Err(IndexerError::NoIndexersAvailable);
        }

        let params = SearchParams {
            query: query.to_string(),
            categories: None,
            limit,
            offset,
        };

        let start = Instant::now();
        debug!(
            indexers = indexers.len(),
            query = query,
            "Starting aggregate search"
        );

        let searches = indexers.iter().map(|indexer| {
            let client = self.client_for(indexer.protocol);
            let params = params.clone();
            async move {
                let outcome = client.search(indexer, &params).await;
                (indexer, outcome)
            }
        });

        let outcomes = futures::future::join_all(searches).await;

        let mut items = Vec::new();
        let mut errors = Vec::new();
        for (indexer, outcome) in outcomes {
            match outcome {
                Ok(mut results) => {
                    metrics::SEARCH_REQUESTS
                        .with_label_values(&[indexer.protocol.as_str(), "success"])
                        .inc();
                    items.append(&mut results);
                }
                Err(e) => {
                    metrics::SEARCH_REQUESTS
                        .with_label_values(&[indexer.protocol.as_str(), "error"])
                        .inc();
                    warn!(indexer = %indexer.name, error = %e, "Indexer search failed");
                    errors.push(format!("{}: {}", indexer.name, e));
                }
            }
        }

        sort_results(&mut items);
        metrics::SEARCH_RESULTS.observe(items.len() as f64);

        debug!(
            results = items.len(),
            errors = errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Aggregate search complete"
        );

        Ok(AggregatedSearch { items, errors })
    }
}

/// Sort by rank descending, then title ascending, then indexer name so equal
/// keys order deterministically.
pub(crate) fn sort_results(items: &mut [SearchResultItem]) {
    items.sort_by(|a, b| {
        b.rank()
            .cmp(&a.rank())
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.indexer_name.cmp(&b.indexer_name))
    });
}
