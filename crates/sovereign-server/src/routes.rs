// ABOUTME: Route definitions for the sovereign-hub HTTP API.
// ABOUTME: Assembles all API routes into a single Axum Router with shared state and request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/log", post(api::sessions::log_session))
        .route("/latest-session", get(api::sessions::latest_session))
        .route("/api/status", get(api::sessions::hub_status))
        .route("/api/artworks", get(api::artworks::list_artworks))
        .route("/api/artworks/{id}", get(api::artworks::get_artwork))
        .route("/api/artworks/{id}/start", post(api::artworks::start_work))
        .route("/api/artworks/{id}/stop", post(api::artworks::stop_work))
        .route("/api/events", get(api::events::list_events))
        .route("/api/events/stream", get(api::stream::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> &'static str {
    "Sovereign Hub Online"
}

/// Liveness check. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "healthy" }))
}
