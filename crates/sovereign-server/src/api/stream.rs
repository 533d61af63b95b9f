// ABOUTME: SSE streaming handler for real-time delivery of appended records.
// ABOUTME: Subscribes to the pipeline's broadcast channel and names each SSE event after the record's discriminator.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use sovereign_core::EventRecord;
use tokio_stream::wrappers::BroadcastStream;

use crate::app_state::SharedState;

/// SSE event name for a record: its `event` field, or "unknown". A name
/// carrying a line break cannot be framed as an SSE field and falls back too.
fn event_type_name(record: &EventRecord) -> &str {
    record
        .event()
        .filter(|e| !e.is_empty() && !e.contains(['\r', '\n']))
        .unwrap_or("unknown")
}

/// Convert a broadcast receiver into an SSE-compatible stream. Lagged
/// receivers skip the records they missed.
fn event_stream_from_receiver(
    rx: tokio::sync::broadcast::Receiver<EventRecord>,
) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
    BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(record) => {
                let data = serde_json::to_string(&record).ok()?;
                Some(Ok(SseEvent::default()
                    .event(event_type_name(&record))
                    .data(data)))
            }
            Err(e) => {
                tracing::debug!("sse subscriber lagged: {}", e);
                None
            }
        }
    })
}

/// GET /api/events/stream - SSE endpoint for records as they are appended.
pub async fn event_stream(State(state): State<SharedState>) -> impl IntoResponse {
    let rx = state.hub.subscribe();
    let stream = event_stream_from_receiver(rx);

    Sse::new(stream).keep_alive(KeepAlive::default())
}
