pub mod config;
pub mod downloader;
pub mod indexer;
pub mod metrics;
pub mod monitor;
pub mod scheduler;
pub mod ssrf;
pub mod store;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use downloader::{
    submit_with_fallback, DownloadClient, DownloadJob, DownloadKind, Downloader, DownloaderError,
    DownloaderGateway, DownloaderKind, FallbackOutcome, RemoteDownload, RemoteStatus, Submission,
};
pub use indexer::{
    AggregatedSearch, Category, ConnectionTest, Indexer, IndexerClient, IndexerError,
    IndexerManagerClient, IndexerProtocol, NewznabClient, SearchAggregator, SearchParams,
    SearchResultItem, TorznabClient,
};
pub use monitor::{AutoSearch, AutoSearchState, GrabError, ReconcileSummary, Reconciler};
pub use scheduler::{PeriodicTask, Scheduler};
pub use store::{
    DownloadStatus, DownloaderStore, Game, GameStatus, GameStore, IndexerStore, Notification,
    NotificationKind, NotificationStore, SqliteStore, Store, StoreError, TrackedDownload,
    TrackedDownloadStore,
};
