// ABOUTME: Artwork API handlers for listing the projection and driving work sessions.
// ABOUTME: Start/stop go through the ingest pipeline so every status change is logged.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sovereign_core::ArtworkSummary;

use crate::api::error_response;
use crate::app_state::SharedState;

/// GET /api/artworks - Summaries of every artwork in the projection.
pub async fn list_artworks(State(state): State<SharedState>) -> Json<Vec<ArtworkSummary>> {
    Json(state.hub.list().await)
}

/// GET /api/artworks/{id} - The full artwork record, including its updates.
pub async fn get_artwork(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.hub.get(&id).await {
        Some(artwork) => Json(artwork).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "artwork not found" })),
        )
            .into_response(),
    }
}

/// POST /api/artworks/{id}/start - Begin a work session on an artwork.
pub async fn start_work(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.hub.start_work(&id).await {
        Ok(_) => summary_response(&state, &id).await,
        Err(e) => error_response(e),
    }
}

/// POST /api/artworks/{id}/stop - End the work session on an artwork.
pub async fn stop_work(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.hub.stop_work(&id).await {
        Ok(_) => summary_response(&state, &id).await,
        Err(e) => error_response(e),
    }
}

async fn summary_response(state: &SharedState, id: &str) -> axum::response::Response {
    match state.hub.get(id).await {
        Some(artwork) => Json(artwork.summary()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "artwork not found" })),
        )
            .into_response(),
    }
}
