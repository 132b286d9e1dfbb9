//! Tracked download and notification handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use ludarr_core::store::{NotificationStore, TrackedDownloadStore};
use ludarr_core::{Notification, TrackedDownload};

use crate::state::AppState;

use super::{internal_error, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// GET /api/v1/downloads
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TrackedDownload>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store()
        .list_tracked()
        .map(Json)
        .map_err(internal_error)
}

/// GET /api/v1/notifications?limit=
pub async fn notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store()
        .list_notifications(query.limit)
        .map(Json)
        .map_err(internal_error)
}
