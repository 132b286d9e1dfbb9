//! REST API surface.

mod downloaders;
mod downloads;
mod games;
mod indexers;
mod routes;
mod search;

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub use routes::create_router;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Shorthand for the (status, body) error tuples handlers return.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
