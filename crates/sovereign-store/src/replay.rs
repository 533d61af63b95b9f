// ABOUTME: Startup replay: reads the JSONL log front to back and folds it into a fresh projection.
// ABOUTME: A missing log is empty history; corrupt lines are skipped and counted, never fatal.

use std::path::Path;

use serde::Serialize;
use sovereign_core::{EventRecord, Projection};

use crate::jsonl::{JsonlLog, LogError};

/// Result of replaying a log into a projection.
#[derive(Debug, Clone, Default)]
pub struct ReplayOutcome {
    pub projection: Projection,
    /// Well-formed records folded, projected or not.
    pub records: usize,
    /// Lines that could not be parsed.
    pub skipped: usize,
}

/// Every well-formed record of a log, in append order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogContents {
    pub records: Vec<EventRecord>,
    pub skipped: usize,
}

/// Rebuild the projection from the log at `path`.
///
/// Recovery sequence:
/// 1. Open a lazy reader; a missing file yields an empty projection
/// 2. Fold each well-formed record in order
/// 3. Log and count corrupt lines, then continue
/// 4. Stop on the first I/O failure and report it
pub fn replay(path: &Path) -> Result<ReplayOutcome, LogError> {
    let reader = match JsonlLog::read_all(path) {
        Ok(r) => r,
        Err(LogError::NotFound(_)) => {
            tracing::info!(path = %path.display(), "no event log found, starting from empty state");
            return Ok(ReplayOutcome::default());
        }
        Err(e) => return Err(e),
    };

    let mut outcome = ReplayOutcome::default();
    for item in reader {
        match item {
            Ok(record) => {
                outcome.projection.apply(&record);
                outcome.records += 1;
            }
            Err(LogError::Corrupt { line, reason }) => {
                tracing::warn!(line, reason = %reason, "skipping corrupt log line");
                outcome.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        records = outcome.records,
        skipped = outcome.skipped,
        artworks = outcome.projection.len(),
        "replayed event log"
    );

    Ok(outcome)
}

/// Read every well-formed record from the log at `path`. A missing file reads
/// as an empty log.
pub fn read_contents(path: &Path) -> Result<LogContents, LogError> {
    let reader = match JsonlLog::read_all(path) {
        Ok(r) => r,
        Err(LogError::NotFound(_)) => return Ok(LogContents::default()),
        Err(e) => return Err(e),
    };

    let mut contents = LogContents::default();
    for item in reader {
        match item {
            Ok(record) => contents.records.push(record),
            Err(LogError::Corrupt { .. }) => contents.skipped += 1,
            Err(e) => return Err(e),
        }
    }
    Ok(contents)
}
