use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{downloaders, downloads, games, indexers, search};
use crate::metrics::render_metrics;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(health))
        .route("/config", get(get_config))
        // Indexers
        .route("/indexers", get(indexers::list))
        .route("/indexers", post(indexers::create))
        .route("/indexers/import", post(indexers::import))
        .route("/indexers/{id}", put(indexers::update))
        .route("/indexers/{id}", delete(indexers::delete))
        .route("/indexers/{id}/test", post(indexers::test))
        .route("/indexers/{id}/categories", get(indexers::categories))
        // Downloaders
        .route("/downloaders", get(downloaders::list))
        .route("/downloaders", post(downloaders::create))
        .route("/downloaders/{id}", put(downloaders::update))
        .route("/downloaders/{id}", delete(downloaders::delete))
        // Search
        .route("/search", get(search::search))
        // Games
        .route("/games", get(games::list))
        .route("/games", post(games::create))
        .route("/games/{id}/grab", post(games::grab))
        // Downloads and notifications
        .route("/downloads", get(downloads::list))
        .route("/notifications", get(downloads::notifications))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
}

/// GET /api/v1/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/v1/config
async fn get_config(State(state): State<Arc<AppState>>) -> Json<ludarr_core::SanitizedConfig> {
    Json(state.sanitized_config())
}
