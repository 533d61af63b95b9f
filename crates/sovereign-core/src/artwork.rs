// ABOUTME: Artwork entity and its lifecycle status, as held by the projection.
// ABOUTME: ArtworkSummary is the reduced view handed to list consumers such as the dashboard.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of an artwork. The known stages have their own variants;
/// any other explicit value supplied by a status update is carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtworkStatus {
    #[default]
    Prep,
    Painting,
    UnderpaintingCompleted,
    Other(String),
}

impl ArtworkStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ArtworkStatus::Prep => "prep",
            ArtworkStatus::Painting => "painting",
            ArtworkStatus::UnderpaintingCompleted => "underpainting_completed",
            ArtworkStatus::Other(s) => s,
        }
    }
}

impl From<&str> for ArtworkStatus {
    fn from(s: &str) -> Self {
        match s {
            "prep" => ArtworkStatus::Prep,
            "painting" => ArtworkStatus::Painting,
            "underpainting_completed" => ArtworkStatus::UnderpaintingCompleted,
            other => ArtworkStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for ArtworkStatus {
    fn from(s: String) -> Self {
        ArtworkStatus::from(s.as_str())
    }
}

impl From<ArtworkStatus> for String {
    fn from(status: ArtworkStatus) -> Self {
        match status {
            ArtworkStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ArtworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields carried by an `artwork_record_created` event. Absent fields fall
/// back to the artwork defaults rather than to any previous record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtworkFields {
    pub title: Option<String>,
    pub status: Option<ArtworkStatus>,
    pub current_apv: Option<f64>,
    pub timestamp: Option<String>,
}

/// The full derived state of one artwork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artwork {
    pub artwork_id: String,
    pub title: String,
    pub status: ArtworkStatus,
    pub current_apv: f64,
    pub updates: Vec<Value>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Artwork {
    /// Build a fresh artwork from creation fields.
    pub fn new(artwork_id: impl Into<String>, fields: ArtworkFields) -> Self {
        Self {
            artwork_id: artwork_id.into(),
            title: fields.title.unwrap_or_default(),
            status: fields.status.unwrap_or_default(),
            current_apv: fields.current_apv.unwrap_or(0.0),
            updates: Vec::new(),
            created_at: fields.timestamp.clone(),
            updated_at: fields.timestamp,
        }
    }

    pub fn summary(&self) -> ArtworkSummary {
        ArtworkSummary {
            artwork_id: self.artwork_id.clone(),
            title: self.title.clone(),
            status: self.status.clone(),
            current_apv: self.current_apv,
        }
    }
}

/// Presentation view of an artwork, without its update history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkSummary {
    pub artwork_id: String,
    pub title: String,
    pub status: ArtworkStatus,
    pub current_apv: f64,
}
