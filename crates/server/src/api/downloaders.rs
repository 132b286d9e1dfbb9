//! Downloader configuration handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use ludarr_core::store::DownloaderStore;
use ludarr_core::{Downloader, DownloaderKind};

use crate::state::AppState;

use super::{api_error, internal_error, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct DownloaderRequest {
    pub name: String,
    pub kind: DownloaderKind,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub download_path: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u8 {
    25
}

impl DownloaderRequest {
    fn into_downloader(self, id: String) -> Downloader {
        Downloader {
            id,
            name: self.name,
            kind: self.kind,
            url: self.url,
            username: self.username,
            password: self.password,
            api_key: self.api_key,
            enabled: self.enabled,
            priority: self.priority,
            category: self.category,
            download_path: self.download_path,
        }
    }
}

/// GET /api/v1/downloaders
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Downloader>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store()
        .list_downloaders()
        .map(Json)
        .map_err(internal_error)
}

/// POST /api/v1/downloaders
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DownloaderRequest>,
) -> Result<(StatusCode, Json<Downloader>), (StatusCode, Json<ErrorResponse>)> {
    let downloader = body.into_downloader(uuid::Uuid::new_v4().to_string());
    state
        .store()
        .upsert_downloader(&downloader)
        .map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(downloader)))
}

/// PUT /api/v1/downloaders/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DownloaderRequest>,
) -> Result<Json<Downloader>, (StatusCode, Json<ErrorResponse>)> {
    if state
        .store()
        .get_downloader(&id)
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(StatusCode::NOT_FOUND, "downloader not found"));
    }

    let downloader = body.into_downloader(id);
    state
        .store()
        .upsert_downloader(&downloader)
        .map_err(internal_error)?;
    Ok(Json(downloader))
}

/// DELETE /api/v1/downloaders/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let deleted = state
        .store()
        .delete_downloader(&id)
        .map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "downloader not found"))
    }
}
