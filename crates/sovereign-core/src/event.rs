// ABOUTME: Event record envelope and its classification into artwork lifecycle events.
// ABOUTME: Records stay raw JSON objects so fields the hub does not understand survive to disk.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::artwork::{ArtworkFields, ArtworkStatus};

/// Origin tag of records that participate in the projection.
pub const CMHP_SYSTEM: &str = "CMHP";

pub const ARTWORK_RECORD_CREATED: &str = "artwork_record_created";
pub const ARTWORK_STATUS_UPDATE: &str = "artwork_status_update";
pub const WORK_SESSION_STARTED: &str = "work_session_started";
pub const WORK_SESSION_STOPPED: &str = "work_session_stopped";

/// One immutable entry of the event log. Wraps the JSON object exactly as it
/// was submitted, plus a `timestamp` when the submitter left it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord(Map<String, Value>);

impl EventRecord {
    /// Accept a raw payload as a record. Returns None for anything that is not
    /// a non-empty JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) if !map.is_empty() => Some(Self(map)),
            _ => None,
        }
    }

    /// Build a CMHP record for a lifecycle event on an artwork, stamped now.
    pub fn synthesized(event: &str, artwork_id: &str) -> Self {
        let mut map = Map::new();
        map.insert("system".to_string(), Value::from(CMHP_SYSTEM));
        map.insert("event".to_string(), Value::from(event));
        map.insert("artwork_id".to_string(), Value::from(artwork_id));
        let mut record = Self(map);
        record.ensure_timestamp();
        record
    }

    /// Stamp the record with the current time unless it already carries one.
    pub fn ensure_timestamp(&mut self) {
        let present = self.0.get("timestamp").is_some_and(|v| !v.is_null());
        if !present {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            self.0.insert("timestamp".to_string(), Value::String(now));
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.str_field("timestamp")
    }

    pub fn system(&self) -> Option<&str> {
        self.str_field("system")
    }

    pub fn event(&self) -> Option<&str> {
        self.str_field("event")
    }

    /// The artwork key, if present as a non-empty string.
    pub fn artwork_id(&self) -> Option<&str> {
        self.str_field("artwork_id").filter(|id| !id.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn status(&self) -> Option<ArtworkStatus> {
        self.str_field("status").map(ArtworkStatus::from)
    }

    pub fn current_apv(&self) -> Option<f64> {
        self.0.get("current_apv").and_then(Value::as_f64)
    }

    /// The free-form `update` payload. JSON null counts as absent.
    pub fn update(&self) -> Option<&Value> {
        self.0.get("update").filter(|v| !v.is_null())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Decide how this record affects the projection.
    pub fn classify(&self) -> ArtworkEvent {
        if self.system() != Some(CMHP_SYSTEM) {
            return ArtworkEvent::Foreign;
        }

        let event = match self.event() {
            Some(e @ (ARTWORK_RECORD_CREATED
            | ARTWORK_STATUS_UPDATE
            | WORK_SESSION_STARTED
            | WORK_SESSION_STOPPED)) => e,
            other => {
                return ArtworkEvent::Unrecognized {
                    event: other.map(str::to_string),
                };
            }
        };

        let Some(artwork_id) = self.artwork_id().map(str::to_string) else {
            return ArtworkEvent::MissingArtworkId {
                event: event.to_string(),
            };
        };
        let timestamp = self.timestamp().map(str::to_string);

        match event {
            ARTWORK_RECORD_CREATED => ArtworkEvent::Created {
                artwork_id,
                fields: ArtworkFields {
                    title: self.title().map(str::to_string),
                    status: self.status(),
                    current_apv: self.current_apv(),
                    timestamp,
                },
            },
            ARTWORK_STATUS_UPDATE => ArtworkEvent::StatusUpdate {
                artwork_id,
                status: self.status(),
                update: self.update().cloned(),
                timestamp,
            },
            WORK_SESSION_STARTED => ArtworkEvent::SessionStarted {
                artwork_id,
                timestamp,
            },
            _ => ArtworkEvent::SessionStopped {
                artwork_id,
                timestamp,
            },
        }
    }
}

/// The typed meaning of a record for the projection.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtworkEvent {
    Created {
        artwork_id: String,
        fields: ArtworkFields,
    },
    StatusUpdate {
        artwork_id: String,
        status: Option<ArtworkStatus>,
        update: Option<Value>,
        timestamp: Option<String>,
    },
    SessionStarted {
        artwork_id: String,
        timestamp: Option<String>,
    },
    SessionStopped {
        artwork_id: String,
        timestamp: Option<String>,
    },
    /// A recognized CMHP discriminator without a usable `artwork_id`.
    MissingArtworkId { event: String },
    /// A CMHP record whose discriminator the projection does not handle.
    Unrecognized { event: Option<String> },
    /// A record from some other system.
    Foreign,
}

impl ArtworkEvent {
    /// True when folding this event can change the projection.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ArtworkEvent::Created { .. }
                | ArtworkEvent::StatusUpdate { .. }
                | ArtworkEvent::SessionStarted { .. }
                | ArtworkEvent::SessionStopped { .. }
        )
    }
}
