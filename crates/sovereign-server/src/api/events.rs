// ABOUTME: Read path over the raw event log.
// ABOUTME: Returns every well-formed record in append order with a count of skipped corrupt lines.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::api::error_response;
use crate::app_state::SharedState;

/// GET /api/events - All records in the log.
pub async fn list_events(State(state): State<SharedState>) -> impl IntoResponse {
    match state.hub.read_all().await {
        Ok(contents) => Json(contents).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::app_state::AppState;
    use crate::routes::create_router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use http::Request;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn events_lists_records_and_skipped_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session_log.jsonl");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .unwrap();
            writeln!(file, r#"{{"system":"CMHP","event":"artwork_record_created","artwork_id":"A1"}}"#)
                .unwrap();
            writeln!(file, "not a record").unwrap();
        }

        let hub = sovereign_store::start(&path).unwrap();
        hub.ingest(Some(serde_json::json!({"system": "CMHP", "event": "note"})))
            .await
            .unwrap();
        let state = Arc::new(AppState::new(hub));

        let resp = create_router(state)
            .oneshot(Request::get("/api/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let records = json["records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["artwork_id"], "A1");
        assert_eq!(records[1]["event"], "note");
        assert_eq!(json["skipped"], 1);
    }
}
