use std::sync::Arc;

use ludarr_core::{
    AutoSearch, AutoSearchState, Config, DownloaderGateway, IndexerManagerClient, SanitizedConfig,
    SearchAggregator, SqliteStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<SqliteStore>,
    aggregator: Arc<SearchAggregator>,
    gateway: Arc<DownloaderGateway>,
    auto_search: Arc<AutoSearch>,
    auto_search_state: Arc<AutoSearchState>,
    discovery: Option<IndexerManagerClient>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<SqliteStore>,
        aggregator: Arc<SearchAggregator>,
        gateway: Arc<DownloaderGateway>,
        auto_search: Arc<AutoSearch>,
        auto_search_state: Arc<AutoSearchState>,
        discovery: Option<IndexerManagerClient>,
    ) -> Self {
        Self {
            config,
            store,
            aggregator,
            gateway,
            auto_search,
            auto_search_state,
            discovery,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn aggregator(&self) -> &SearchAggregator {
        &self.aggregator
    }

    #[allow(dead_code)]
    pub fn gateway(&self) -> &DownloaderGateway {
        &self.gateway
    }

    pub fn auto_search(&self) -> &AutoSearch {
        &self.auto_search
    }

    pub fn auto_search_state(&self) -> &AutoSearchState {
        &self.auto_search_state
    }

    pub fn discovery(&self) -> Option<&IndexerManagerClient> {
        self.discovery.as_ref()
    }
}
