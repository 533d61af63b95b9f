// ABOUTME: The projection table: artwork state derived by folding event records in log order.
// ABOUTME: apply() pattern-matches on the classified record; checkpoints allow undoing one uncommitted event.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::artwork::{Artwork, ArtworkFields, ArtworkStatus, ArtworkSummary};
use crate::event::{ArtworkEvent, EventRecord};

/// Errors raised by direct projection operations.
#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("artwork not found: {0}")]
    NotFound(String),
}

/// In-memory map from artwork id to its current state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    artworks: BTreeMap<String, Artwork>,
    /// Status updates that named an artwork never created.
    dropped_updates: u64,
}

/// The pre-image of a single artwork, taken before an event is applied so the
/// event can be rolled back if it never reaches the log.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    artwork_id: Option<String>,
    prior: Option<Artwork>,
    dropped_updates: u64,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the artwork at `artwork_id`. A previous record at
    /// the same id is replaced whole.
    pub fn create(&mut self, artwork_id: &str, fields: ArtworkFields) {
        self.artworks
            .insert(artwork_id.to_string(), Artwork::new(artwork_id, fields));
    }

    /// Attach an update payload to an existing artwork. Returns false, and
    /// counts the drop, when the artwork does not exist.
    pub fn apply_status_update(&mut self, artwork_id: &str, update: Value) -> bool {
        match self.artworks.get_mut(artwork_id) {
            Some(artwork) => {
                artwork.updates.push(update);
                true
            }
            None => {
                self.record_dropped(artwork_id);
                false
            }
        }
    }

    pub fn set_status(
        &mut self,
        artwork_id: &str,
        status: ArtworkStatus,
    ) -> Result<(), ProjectionError> {
        let artwork = self
            .artworks
            .get_mut(artwork_id)
            .ok_or_else(|| ProjectionError::NotFound(artwork_id.to_string()))?;
        artwork.status = status;
        Ok(())
    }

    pub fn get(&self, artwork_id: &str) -> Option<&Artwork> {
        self.artworks.get(artwork_id)
    }

    /// Summaries of every artwork, ordered by id.
    pub fn list(&self) -> Vec<ArtworkSummary> {
        self.artworks.values().map(Artwork::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.artworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artworks.is_empty()
    }

    pub fn dropped_updates(&self) -> u64 {
        self.dropped_updates
    }

    /// Fold a single record into the table and return how it was classified.
    /// Records that are foreign, unrecognized, or lack an artwork id leave the
    /// table untouched.
    pub fn apply(&mut self, record: &EventRecord) -> ArtworkEvent {
        let event = record.classify();

        match &event {
            ArtworkEvent::Created { artwork_id, fields } => {
                self.create(artwork_id, fields.clone());
            }

            ArtworkEvent::StatusUpdate {
                artwork_id,
                status,
                update,
                timestamp,
            } => {
                match self.artworks.get_mut(artwork_id) {
                    Some(artwork) => {
                        if let Some(update) = update {
                            artwork.updates.push(update.clone());
                        }
                        if let Some(status) = status {
                            artwork.status = status.clone();
                        }
                        artwork.updated_at = timestamp.clone();
                    }
                    None => self.record_dropped(artwork_id),
                }
            }

            ArtworkEvent::SessionStarted {
                artwork_id,
                timestamp,
            } => {
                if self.set_status(artwork_id, ArtworkStatus::Painting).is_ok() {
                    self.touch(artwork_id, timestamp);
                }
            }

            ArtworkEvent::SessionStopped {
                artwork_id,
                timestamp,
            } => {
                if self
                    .set_status(artwork_id, ArtworkStatus::UnderpaintingCompleted)
                    .is_ok()
                {
                    self.touch(artwork_id, timestamp);
                }
            }

            ArtworkEvent::MissingArtworkId { event } => {
                tracing::debug!(event = %event, "record has no artwork_id, not projected");
            }

            ArtworkEvent::Unrecognized { .. } | ArtworkEvent::Foreign => {}
        }

        event
    }

    /// Capture the state that applying an event to `artwork_id` could change.
    pub fn checkpoint(&self, artwork_id: Option<&str>) -> Checkpoint {
        Checkpoint {
            artwork_id: artwork_id.map(str::to_string),
            prior: artwork_id.and_then(|id| self.artworks.get(id).cloned()),
            dropped_updates: self.dropped_updates,
        }
    }

    /// Roll the table back to a checkpoint taken before the last event.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        if let Some(id) = checkpoint.artwork_id {
            match checkpoint.prior {
                Some(artwork) => {
                    self.artworks.insert(id, artwork);
                }
                None => {
                    self.artworks.remove(&id);
                }
            }
        }
        self.dropped_updates = checkpoint.dropped_updates;
    }

    fn touch(&mut self, artwork_id: &str, timestamp: &Option<String>) {
        if let Some(artwork) = self.artworks.get_mut(artwork_id) {
            artwork.updated_at = timestamp.clone();
        }
    }

    fn record_dropped(&mut self, artwork_id: &str) {
        self.dropped_updates += 1;
        tracing::warn!(
            artwork_id = %artwork_id,
            dropped_total = self.dropped_updates,
            "status update for unknown artwork dropped"
        );
    }
}

/// Build a projection by folding records from empty state.
pub fn fold<'a, I>(records: I) -> Projection
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut projection = Projection::new();
    for record in records {
        projection.apply(record);
    }
    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> EventRecord {
        EventRecord::from_value(value).unwrap()
    }

    fn created(id: &str, title: &str) -> EventRecord {
        record(json!({
            "system": "CMHP",
            "event": "artwork_record_created",
            "artwork_id": id,
            "title": title,
            "timestamp": "2024-05-01T10:00:00Z"
        }))
    }

    fn cmhp(event: &str, id: &str) -> EventRecord {
        record(json!({
            "system": "CMHP",
            "event": event,
            "artwork_id": id,
            "timestamp": "2024-05-01T11:00:00Z"
        }))
    }

    #[test]
    fn create_inserts_artwork_with_defaults() {
        let mut p = Projection::new();
        p.apply(&created("A1", "Orchard"));

        let art = p.get("A1").unwrap();
        assert_eq!(art.title, "Orchard");
        assert_eq!(art.status, ArtworkStatus::Prep);
        assert_eq!(art.created_at.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn duplicate_creation_overwrites_without_merge() {
        let mut p = Projection::new();
        p.apply(&record(json!({
            "system": "CMHP",
            "event": "artwork_record_created",
            "artwork_id": "A1",
            "title": "First",
            "current_apv": 900
        })));
        p.apply(&record(json!({
            "system": "CMHP",
            "event": "artwork_status_update",
            "artwork_id": "A1",
            "update": {"layer": 1}
        })));
        p.apply(&created("A1", "Second"));

        let art = p.get("A1").unwrap();
        assert_eq!(art.title, "Second");
        assert_eq!(art.current_apv, 0.0, "apv from the first record must not survive");
        assert!(art.updates.is_empty(), "updates from the first record must not survive");
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn status_update_appends_payload_in_order() {
        let mut p = Projection::new();
        p.apply(&created("A1", "Orchard"));
        for n in 1..=3 {
            p.apply(&record(json!({
                "system": "CMHP",
                "event": "artwork_status_update",
                "artwork_id": "A1",
                "update": {"pass": n}
            })));
        }

        let art = p.get("A1").unwrap();
        assert_eq!(
            art.updates,
            vec![json!({"pass": 1}), json!({"pass": 2}), json!({"pass": 3})]
        );
    }

    #[test]
    fn status_update_with_explicit_status_sets_it() {
        let mut p = Projection::new();
        p.apply(&created("A1", "Orchard"));
        p.apply(&record(json!({
            "system": "CMHP",
            "event": "artwork_status_update",
            "artwork_id": "A1",
            "status": "glazing"
        })));

        assert_eq!(
            p.get("A1").unwrap().status,
            ArtworkStatus::Other("glazing".to_string())
        );
    }

    #[test]
    fn status_update_with_payload_and_status_applies_both() {
        let mut p = Projection::new();
        p.apply(&created("A1", "Orchard"));
        p.apply(&record(json!({
            "system": "CMHP",
            "event": "artwork_status_update",
            "artwork_id": "A1",
            "status": "painting",
            "update": {"layer": "sky"},
            "timestamp": "2024-05-02T09:30:00Z"
        })));

        let art = p.get("A1").unwrap();
        assert_eq!(art.status, ArtworkStatus::Painting);
        assert_eq!(art.updates, vec![json!({"layer": "sky"})]);
        assert_eq!(art.updated_at.as_deref(), Some("2024-05-02T09:30:00Z"));
        assert_eq!(p.dropped_updates(), 0);
    }

    #[test]
    fn status_update_for_unknown_artwork_is_dropped() {
        let mut p = Projection::new();
        let event = p.apply(&record(json!({
            "system": "CMHP",
            "event": "artwork_status_update",
            "artwork_id": "ghost",
            "update": {"note": "lost"}
        })));

        assert!(matches!(event, ArtworkEvent::StatusUpdate { .. }));
        assert!(p.is_empty());
        assert_eq!(p.dropped_updates(), 1);
        assert!(!p.apply_status_update("ghost", json!({})));
        assert_eq!(p.dropped_updates(), 2);
    }

    #[test]
    fn session_events_drive_state_machine() {
        let mut p = Projection::new();
        p.apply(&created("A1", "Orchard"));

        p.apply(&cmhp("work_session_started", "A1"));
        assert_eq!(p.get("A1").unwrap().status, ArtworkStatus::Painting);
        assert_eq!(
            p.get("A1").unwrap().updated_at.as_deref(),
            Some("2024-05-01T11:00:00Z")
        );

        p.apply(&cmhp("work_session_stopped", "A1"));
        assert_eq!(
            p.get("A1").unwrap().status,
            ArtworkStatus::UnderpaintingCompleted
        );
    }

    #[test]
    fn stop_applies_even_when_not_painting() {
        let mut p = Projection::new();
        p.apply(&created("A1", "Orchard"));
        p.apply(&cmhp("work_session_stopped", "A1"));
        assert_eq!(
            p.get("A1").unwrap().status,
            ArtworkStatus::UnderpaintingCompleted
        );
    }

    #[test]
    fn session_events_for_unknown_artwork_do_nothing() {
        let mut p = Projection::new();
        p.apply(&cmhp("work_session_started", "nobody"));
        assert!(p.is_empty());
        assert_eq!(p.dropped_updates(), 0);
    }

    #[test]
    fn set_status_unknown_id_is_not_found() {
        let mut p = Projection::new();
        let err = p.set_status("A404", ArtworkStatus::Painting).unwrap_err();
        assert_eq!(err, ProjectionError::NotFound("A404".to_string()));
    }

    #[test]
    fn foreign_records_are_ignored() {
        let mut p = Projection::new();
        p.apply(&record(json!({
            "system": "ELSEWHERE",
            "event": "artwork_record_created",
            "artwork_id": "A1",
            "title": "Not ours"
        })));
        assert!(p.is_empty());
    }

    #[test]
    fn list_is_ordered_and_repeatable() {
        let mut p = Projection::new();
        p.apply(&created("B2", "Second"));
        p.apply(&created("A1", "First"));

        let first = p.list();
        let second = p.list();
        assert_eq!(first, second);
        assert_eq!(first[0].artwork_id, "A1");
        assert_eq!(first[1].artwork_id, "B2");
    }

    #[test]
    fn restore_undoes_creation_and_overwrite() {
        let mut p = Projection::new();
        p.apply(&created("A1", "Original"));

        let cp = p.checkpoint(Some("A1"));
        p.apply(&created("A1", "Replacement"));
        p.restore(cp);
        assert_eq!(p.get("A1").unwrap().title, "Original");

        let cp = p.checkpoint(Some("N1"));
        p.apply(&created("N1", "New"));
        p.restore(cp);
        assert!(p.get("N1").is_none());
    }

    #[test]
    fn restore_resets_dropped_counter() {
        let mut p = Projection::new();
        let cp = p.checkpoint(Some("ghost"));
        p.apply_status_update("ghost", json!({}));
        p.restore(cp);
        assert_eq!(p.dropped_updates(), 0);
    }

    #[test]
    fn fold_matches_incremental_apply() {
        let records = vec![
            created("A1", "Orchard"),
            cmhp("work_session_started", "A1"),
            created("A2", "Harbor"),
            cmhp("work_session_stopped", "A1"),
        ];

        let mut live = Projection::new();
        for r in &records {
            live.apply(r);
        }

        assert_eq!(fold(&records), live);
    }
}
