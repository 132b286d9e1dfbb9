//! Game tracking handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use ludarr_core::store::GameStore;
use ludarr_core::{FallbackOutcome, Game, GameStatus, GrabError};

use crate::state::AppState;

use super::{api_error, internal_error, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct GameRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct GrabQuery {
    /// User triggering the grab; gates the per-user cooldown.
    #[serde(default)]
    pub user: Option<String>,
}

/// GET /api/v1/games
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Game>>, (StatusCode, Json<ErrorResponse>)> {
    state.store().list_games().map(Json).map_err(internal_error)
}

/// POST /api/v1/games
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GameRequest>,
) -> Result<(StatusCode, Json<Game>), (StatusCode, Json<ErrorResponse>)> {
    if body.title.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "title must not be empty"));
    }

    let game = Game {
        id: uuid::Uuid::new_v4().to_string(),
        title: body.title,
        status: GameStatus::Wanted,
        added_at: Utc::now(),
    };
    state.store().upsert_game(&game).map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// POST /api/v1/games/{id}/grab
///
/// Search for the game and submit the best release through the downloader
/// fallback chain.
pub async fn grab(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<GrabQuery>,
) -> Result<Json<FallbackOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let game = state
        .store()
        .get_game(&id)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "game not found"))?;

    if let Some(ref user) = query.user {
        let cooldown = Duration::from_secs(state.config().auto_search.user_cooldown_secs);
        if !state.auto_search_state().should_run(user, cooldown) {
            return Err(api_error(
                StatusCode::TOO_MANY_REQUESTS,
                "auto-search cooldown in effect",
            ));
        }
    }

    match state.auto_search().grab_game(&game).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(GrabError::NoResults(title)) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("no results for \"{}\"", title),
        )),
        Err(GrabError::Indexer(e)) => Err(api_error(StatusCode::PRECONDITION_FAILED, e.to_string())),
        Err(GrabError::Downloader(e)) => {
            Err(api_error(StatusCode::PRECONDITION_FAILED, e.to_string()))
        }
        Err(e) => Err(internal_error(e)),
    }
}
