// ABOUTME: API module containing all HTTP handler functions for the sovereign-hub REST API.
// ABOUTME: Organized into sub-modules for session logging, artwork reads and work sessions, and the record log.

pub mod artworks;
pub mod events;
pub mod sessions;
pub mod stream;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sovereign_store::IngestError;

/// Map a pipeline error to a JSON error response.
pub(crate) fn error_response(err: IngestError) -> Response {
    let status = match &err {
        IngestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        IngestError::NotFound(_) => StatusCode::NOT_FOUND,
        IngestError::Log(_) | IngestError::ChannelClosed => {
            tracing::error!("request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
