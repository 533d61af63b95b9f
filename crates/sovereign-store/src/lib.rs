// ABOUTME: Persistence layer for sovereign-hub, handling record storage and state reconstruction.
// ABOUTME: Provides the JSONL event log, startup replay, and the ingest pipeline that ties them together.

pub mod jsonl;
pub mod pipeline;
pub mod replay;

pub use jsonl::{JsonlLog, LogError, LogReader};
pub use pipeline::{HubHandle, HubStats, IngestError, spawn, start};
pub use replay::{LogContents, ReplayOutcome, read_contents, replay};
