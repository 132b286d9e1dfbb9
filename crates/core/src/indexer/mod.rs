//! Indexer search: protocol clients, category policy and the aggregator.

mod aggregator;
pub mod categories;
mod feed;
mod import;
mod newznab;
mod torznab;
mod types;

pub use aggregator::{AggregatedSearch, SearchAggregator};
pub use feed::{parse_caps_categories, parse_feed, parse_feed_date, FeedItem};
pub use import::{IndexerManagerClient, ManagedIndexer};
pub use newznab::NewznabClient;
pub use torznab::TorznabClient;
pub use types::*;
