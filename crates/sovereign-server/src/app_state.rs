// ABOUTME: Shared application state for the sovereign-hub HTTP server.
// ABOUTME: Holds the ingest pipeline handle that every handler reads from and writes through.

use std::sync::Arc;

use sovereign_store::HubHandle;

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub hub: HubHandle,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create a new AppState around a running pipeline.
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }
}
