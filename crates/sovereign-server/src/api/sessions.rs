// ABOUTME: Session logging handlers: raw record ingest, latest record lookup, and hub counters.
// ABOUTME: Any JSON body is accepted by /log; an empty or unparseable body is rejected before anything is written.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use sovereign_store::{HubStats, IngestError, LogError};

use crate::api::error_response;
use crate::app_state::SharedState;

/// POST /log - Append one event record and fold it into the projection.
pub async fn log_session(State(state): State<SharedState>, body: Bytes) -> impl IntoResponse {
    let raw = serde_json::from_slice::<Value>(&body).ok();

    match state.hub.ingest(raw).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "success", "message": "Session logged" })),
        )
            .into_response(),
        Err(IngestError::InvalidInput(_)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "No data provided" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /latest-session - The most recently logged record.
pub async fn latest_session(State(state): State<SharedState>) -> impl IntoResponse {
    match state.hub.latest().await {
        Ok(Some(record)) => (StatusCode::OK, Json(record.into_value())).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No sessions found" })),
        )
            .into_response(),
        Err(IngestError::Log(LogError::NotFound(_))) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No session log file" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/status - Projection and ingest counters.
pub async fn hub_status(State(state): State<SharedState>) -> Json<HubStats> {
    Json(state.hub.stats().await)
}
