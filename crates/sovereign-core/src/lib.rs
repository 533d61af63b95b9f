// ABOUTME: Core library for sovereign-hub: event records, the artwork model, and the projection.
// ABOUTME: Nothing here touches disk; the store crate feeds records in and persists them.

pub mod artwork;
pub mod event;
pub mod projection;

pub use artwork::{Artwork, ArtworkFields, ArtworkStatus, ArtworkSummary};
pub use event::{
    ARTWORK_RECORD_CREATED, ARTWORK_STATUS_UPDATE, ArtworkEvent, CMHP_SYSTEM, EventRecord,
    WORK_SESSION_STARTED, WORK_SESSION_STOPPED,
};
pub use projection::{Checkpoint, Projection, ProjectionError, fold};
