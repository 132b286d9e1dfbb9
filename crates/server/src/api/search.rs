//! Search handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use ludarr_core::{AggregatedSearch, IndexerError};

use crate::state::AppState;

use super::{api_error, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// GET /api/v1/search?q=&limit=&offset=
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<AggregatedSearch>, (StatusCode, Json<ErrorResponse>)> {
    if query.q.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query must not be empty"));
    }

    match state
        .aggregator()
        .search_all(&query.q, query.limit, query.offset)
        .await
    {
        Ok(result) => Ok(Json(result)),
        Err(IndexerError::NoIndexersAvailable) => Err(api_error(
            StatusCode::PRECONDITION_FAILED,
            IndexerError::NoIndexersAvailable.to_string(),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
