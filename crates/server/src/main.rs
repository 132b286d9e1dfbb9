mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ludarr_core::{
    load_config, validate_config, AutoSearch, AutoSearchState, DownloaderGateway,
    IndexerManagerClient, Reconciler, Scheduler, SearchAggregator, SqliteStore, Store,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("LUDARR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Create the store
    let store = Arc::new(
        SqliteStore::new(&config.database.path).context("Failed to open database")?,
    );
    info!("Store initialized");

    // Engine components
    let aggregator = Arc::new(SearchAggregator::new(
        Arc::clone(&store) as Arc<dyn ludarr_core::IndexerStore>
    ));
    let gateway = Arc::new(DownloaderGateway::new());
    let auto_search = Arc::new(AutoSearch::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::clone(&aggregator),
        Arc::clone(&gateway),
    ));
    let auto_search_state = Arc::new(AutoSearchState::new());

    let discovery = config.discovery.as_ref().map(|d| {
        info!("Indexer manager import configured at {}", d.url);
        IndexerManagerClient::new(d.url.clone(), d.api_key.clone())
    });

    // Reconciliation loop
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::clone(&gateway),
    ));
    let reconcile_scheduler = Scheduler::new(Duration::from_secs(
        config.monitor.reconcile_interval_secs,
    ));
    reconcile_scheduler.start(reconciler);
    info!(
        interval_secs = config.monitor.reconcile_interval_secs,
        "Reconciliation loop started"
    );

    // Auto-search sweep
    let auto_search_scheduler = if config.auto_search.enabled {
        let scheduler = Scheduler::new(Duration::from_secs(
            config.auto_search.sweep_interval_secs,
        ));
        scheduler.start(Arc::clone(&auto_search) as Arc<dyn ludarr_core::PeriodicTask>);
        info!(
            interval_secs = config.auto_search.sweep_interval_secs,
            "Auto-search sweep started"
        );
        Some(scheduler)
    } else {
        info!("Auto-search sweep disabled");
        None
    };

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        aggregator,
        gateway,
        auto_search,
        auto_search_state,
        discovery,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    reconcile_scheduler.stop();
    if let Some(scheduler) = auto_search_scheduler {
        scheduler.stop();
    }
    info!("Background tasks stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
