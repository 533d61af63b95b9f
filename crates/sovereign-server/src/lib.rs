// ABOUTME: HTTP server for sovereign-hub, providing the ingest API and SSE record streaming.
// ABOUTME: Uses Axum with a shared pipeline handle; the dashboard consumes the artwork list endpoint.

pub mod api;
pub mod app_state;
pub mod config;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, HubConfig};
pub use routes::create_router;
