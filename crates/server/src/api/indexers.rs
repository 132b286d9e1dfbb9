//! Indexer configuration handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use ludarr_core::store::IndexerStore;
use ludarr_core::{Category, ConnectionTest, Indexer, IndexerProtocol};

use crate::state::AppState;

use super::{api_error, internal_error, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct IndexerRequest {
    pub name: String,
    pub url: String,
    pub api_key: String,
    pub protocol: IndexerProtocol,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_true")]
    pub rss_enabled: bool,
    #[serde(default = "default_true")]
    pub auto_search_enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u8 {
    25
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

/// GET /api/v1/indexers
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Indexer>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store()
        .list_indexers()
        .map(Json)
        .map_err(internal_error)
}

/// POST /api/v1/indexers
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IndexerRequest>,
) -> Result<(StatusCode, Json<Indexer>), (StatusCode, Json<ErrorResponse>)> {
    let indexer = Indexer {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name,
        url: body.url,
        api_key: body.api_key,
        protocol: body.protocol,
        enabled: body.enabled,
        priority: body.priority,
        categories: body.categories,
        rss_enabled: body.rss_enabled,
        auto_search_enabled: body.auto_search_enabled,
    };
    state
        .store()
        .upsert_indexer(&indexer)
        .map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(indexer)))
}

/// PUT /api/v1/indexers/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<IndexerRequest>,
) -> Result<Json<Indexer>, (StatusCode, Json<ErrorResponse>)> {
    if state
        .store()
        .get_indexer(&id)
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(StatusCode::NOT_FOUND, "indexer not found"));
    }

    let indexer = Indexer {
        id,
        name: body.name,
        url: body.url,
        api_key: body.api_key,
        protocol: body.protocol,
        enabled: body.enabled,
        priority: body.priority,
        categories: body.categories,
        rss_enabled: body.rss_enabled,
        auto_search_enabled: body.auto_search_enabled,
    };
    state
        .store()
        .upsert_indexer(&indexer)
        .map_err(internal_error)?;
    Ok(Json(indexer))
}

/// DELETE /api/v1/indexers/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let deleted = state.store().delete_indexer(&id).map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "indexer not found"))
    }
}

/// POST /api/v1/indexers/{id}/test
pub async fn test(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionTest>, (StatusCode, Json<ErrorResponse>)> {
    let indexer = state
        .store()
        .get_indexer(&id)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "indexer not found"))?;

    let client = state.aggregator().client_for(indexer.protocol);
    client
        .test_connection(&indexer)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))
}

/// GET /api/v1/indexers/{id}/categories
pub async fn categories(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Category>>, (StatusCode, Json<ErrorResponse>)> {
    let indexer = state
        .store()
        .get_indexer(&id)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "indexer not found"))?;

    let client = state.aggregator().client_for(indexer.protocol);
    client
        .list_categories(&indexer)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))
}

/// POST /api/v1/indexers/import
///
/// Pull indexer definitions from the configured indexer-manager service.
pub async fn import(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportResponse>, (StatusCode, Json<ErrorResponse>)> {
    let discovery = state.discovery().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "No indexer manager configured",
        )
    })?;

    let indexers = discovery
        .fetch_indexers()
        .await
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))?;

    let mut imported = 0;
    for indexer in &indexers {
        state
            .store()
            .upsert_indexer(indexer)
            .map_err(internal_error)?;
        imported += 1;
    }

    Ok(Json(ImportResponse { imported }))
}
