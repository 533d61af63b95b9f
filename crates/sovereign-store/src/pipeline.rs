// ABOUTME: Ingest pipeline actor: validates records, applies them to the projection, then appends them to the log.
// ABOUTME: Provides HubHandle for submitting events, starting/stopping work sessions, and reading state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;
use sovereign_core::{
    Artwork, ArtworkStatus, ArtworkSummary, Checkpoint, EventRecord, Projection,
    WORK_SESSION_STARTED, WORK_SESSION_STOPPED,
};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};

use crate::jsonl::{JsonlLog, LogError};
use crate::replay::{LogContents, read_contents, replay};

/// Errors surfaced to callers of the pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("artwork not found: {0}")]
    NotFound(String),

    #[error("log error: {0}")]
    Log(#[from] LogError),

    #[error("ingest pipeline closed")]
    ChannelClosed,
}

/// Counters reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HubStats {
    pub artworks: usize,
    pub dropped_updates: u64,
    pub ingested: u64,
    pub log_path: String,
}

#[derive(Debug)]
enum Command {
    Ingest(Option<Value>),
    StartWork(String),
    StopWork(String),
}

/// Message type sent through the command channel: a command paired with
/// a oneshot sender for the stored record.
type CommandMessage = (Command, oneshot::Sender<Result<EventRecord, IngestError>>);

/// Public handle for the ingest pipeline. Cheap to clone; every clone talks to
/// the same actor and reads the same projection.
#[derive(Clone)]
pub struct HubHandle {
    cmd_tx: mpsc::Sender<CommandMessage>,
    event_tx: broadcast::Sender<EventRecord>,
    projection: Arc<RwLock<Projection>>,
    ingested: Arc<AtomicU64>,
    log_path: PathBuf,
}

impl HubHandle {
    /// Submit a raw event payload. Returns the record as it was stored,
    /// including any assigned timestamp.
    pub async fn ingest(&self, raw: Option<Value>) -> Result<EventRecord, IngestError> {
        self.send(Command::Ingest(raw)).await
    }

    /// Move an artwork to `painting` and log a `work_session_started` record.
    pub async fn start_work(&self, artwork_id: &str) -> Result<EventRecord, IngestError> {
        self.send(Command::StartWork(artwork_id.to_string())).await
    }

    /// Move an artwork to `underpainting_completed` and log a
    /// `work_session_stopped` record.
    pub async fn stop_work(&self, artwork_id: &str) -> Result<EventRecord, IngestError> {
        self.send(Command::StopWork(artwork_id.to_string())).await
    }

    async fn send(&self, cmd: Command) -> Result<EventRecord, IngestError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send((cmd, tx))
            .await
            .map_err(|_| IngestError::ChannelClosed)?;
        rx.await.map_err(|_| IngestError::ChannelClosed)?
    }

    pub async fn list(&self) -> Vec<ArtworkSummary> {
        self.projection.read().await.list()
    }

    pub async fn get(&self, artwork_id: &str) -> Option<Artwork> {
        self.projection.read().await.get(artwork_id).cloned()
    }

    /// Get a read-only view of the live projection.
    pub async fn read_projection(&self) -> tokio::sync::RwLockReadGuard<'_, Projection> {
        self.projection.read().await
    }

    /// Every well-formed record in the log. Holds the projection read lock so
    /// no append is in flight while the file is read.
    pub async fn read_all(&self) -> Result<LogContents, IngestError> {
        let _guard = self.projection.read().await;
        Ok(read_contents(&self.log_path)?)
    }

    /// The most recently appended well-formed record.
    pub async fn latest(&self) -> Result<Option<EventRecord>, IngestError> {
        let _guard = self.projection.read().await;
        Ok(JsonlLog::latest(&self.log_path)?)
    }

    pub async fn stats(&self) -> HubStats {
        let projection = self.projection.read().await;
        HubStats {
            artworks: projection.len(),
            dropped_updates: projection.dropped_updates(),
            ingested: self.ingested.load(Ordering::Relaxed),
            log_path: self.log_path.display().to_string(),
        }
    }

    /// Subscribe to every record appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.event_tx.subscribe()
    }
}

/// Replay the log at `path` into a fresh projection, then spawn the pipeline
/// over it. Replay finishes before the handle exists, so no ingest can race it.
pub fn start(path: &Path) -> Result<HubHandle, IngestError> {
    let outcome = replay(path)?;
    let log = JsonlLog::open(path)?;
    Ok(spawn(log, outcome.projection))
}

/// Spawn a pipeline actor that owns `log` and starts from `projection`.
/// The actor processes commands sequentially; each one holds the projection
/// write lock from its first mutation until its record is on disk.
pub fn spawn(log: JsonlLog, projection: Projection) -> HubHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<CommandMessage>(64);
    let (event_tx, _) = broadcast::channel::<EventRecord>(256);
    let projection = Arc::new(RwLock::new(projection));
    let ingested = Arc::new(AtomicU64::new(0));

    let handle = HubHandle {
        cmd_tx,
        event_tx: event_tx.clone(),
        projection: Arc::clone(&projection),
        ingested: Arc::clone(&ingested),
        log_path: log.path().to_path_buf(),
    };

    let actor = HubActor {
        projection,
        log,
        cmd_rx,
        event_tx,
        ingested,
    };

    tokio::spawn(actor.run());

    handle
}

/// The internal actor that owns the log file.
struct HubActor {
    projection: Arc<RwLock<Projection>>,
    log: JsonlLog,
    cmd_rx: mpsc::Receiver<CommandMessage>,
    event_tx: broadcast::Sender<EventRecord>,
    ingested: Arc<AtomicU64>,
}

impl HubActor {
    async fn run(mut self) {
        while let Some((cmd, reply_tx)) = self.cmd_rx.recv().await {
            let result = self.process_command(cmd).await;
            // The caller may have dropped their receiver
            let _ = reply_tx.send(result);
        }
    }

    async fn process_command(&mut self, cmd: Command) -> Result<EventRecord, IngestError> {
        let shared = Arc::clone(&self.projection);
        let mut projection = shared.write().await;

        match cmd {
            Command::Ingest(raw) => {
                let mut record = raw
                    .and_then(EventRecord::from_value)
                    .ok_or_else(|| IngestError::InvalidInput("no data provided".to_string()))?;
                record.ensure_timestamp();

                let checkpoint = projection.checkpoint(record.artwork_id());
                let applied = projection.apply(&record);
                if !applied.is_mutating() {
                    tracing::debug!(?applied, "record logged without projection change");
                }
                self.commit(&mut projection, record, checkpoint)
            }

            Command::StartWork(artwork_id) => self.run_session(
                &mut projection,
                &artwork_id,
                ArtworkStatus::Painting,
                WORK_SESSION_STARTED,
            ),

            Command::StopWork(artwork_id) => self.run_session(
                &mut projection,
                &artwork_id,
                ArtworkStatus::UnderpaintingCompleted,
                WORK_SESSION_STOPPED,
            ),
        }
    }

    fn run_session(
        &mut self,
        projection: &mut Projection,
        artwork_id: &str,
        status: ArtworkStatus,
        event: &str,
    ) -> Result<EventRecord, IngestError> {
        let checkpoint = projection.checkpoint(Some(artwork_id));
        projection
            .set_status(artwork_id, status)
            .map_err(|_| IngestError::NotFound(artwork_id.to_string()))?;

        let record = EventRecord::synthesized(event, artwork_id);
        projection.apply(&record);
        self.commit(projection, record, checkpoint)
    }

    /// Append an already-applied record. If the write fails the projection is
    /// rolled back so memory never holds an event the log lacks.
    fn commit(
        &mut self,
        projection: &mut Projection,
        record: EventRecord,
        checkpoint: Checkpoint,
    ) -> Result<EventRecord, IngestError> {
        if let Err(e) = self.log.append(&record) {
            tracing::error!(error = %e, "failed to append record, rolling back projection");
            projection.restore(checkpoint);
            return Err(e.into());
        }

        self.ingested.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            system = record.system().unwrap_or("-"),
            event = record.event().unwrap_or("-"),
            artwork_id = record.artwork_id().unwrap_or("-"),
            "session logged"
        );

        // Ignore broadcast errors (no active subscribers is fine)
        let _ = self.event_tx.send(record.clone());

        Ok(record)
    }
}
