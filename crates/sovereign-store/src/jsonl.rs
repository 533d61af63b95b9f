// ABOUTME: Append-only JSONL event log for durable record storage.
// ABOUTME: Provides fsynced append and a lazy line-by-line reader that skips over corrupt lines.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sovereign_core::EventRecord;
use thiserror::Error;

/// Errors that can occur during JSONL log operations.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("no event log at {}", .0.display())]
    NotFound(PathBuf),

    #[error("corrupt record on line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An append-only JSONL event log backed by a file.
/// Each line is a single JSON object followed by a newline.
pub struct JsonlLog {
    path: PathBuf,
    file: File,
    /// Set when a failed append could not be trimmed off the file, so the
    /// next append must start on a fresh line.
    unsealed: bool,
    /// Makes the next appends tear halfway and fail while set.
    #[cfg(test)]
    pub(crate) fault: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl JsonlLog {
    /// Returns the path to the underlying JSONL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (or create) a JSONL log file at the given path.
    /// Creates parent directories if they do not exist.
    /// If a previous crash left a partial last line without its newline, a
    /// newline is appended so the next record starts on a line of its own.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        if ends_mid_line(path)? {
            tracing::warn!(path = %path.display(), "event log ends mid-line, sealing partial record");
            file.write_all(b"\n")?;
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            unsealed: false,
            #[cfg(test)]
            fault: Default::default(),
        })
    }

    /// Append a single record to the log. Serializes as one JSON line,
    /// writes it with a trailing newline, and fsyncs to disk.
    ///
    /// On failure the file is truncated back to its length before the call,
    /// so a record reported as failed never survives on disk and a torn write
    /// cannot merge with the next record.
    pub fn append(&mut self, record: &EventRecord) -> Result<(), LogError> {
        let mut line = Vec::new();
        if self.unsealed {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, record)?;
        line.push(b'\n');

        let committed_len = self.file.metadata()?.len();
        if let Err(e) = self.write_synced(&line) {
            self.trim_to(committed_len);
            return Err(e.into());
        }
        self.unsealed = false;
        Ok(())
    }

    fn write_synced(&mut self, line: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if self.fault.load(std::sync::atomic::Ordering::SeqCst) {
            self.file.write_all(&line[..line.len() / 2])?;
            return Err(io::Error::other("injected append failure"));
        }

        self.file.write_all(line)?;
        self.file.sync_all()
    }

    fn trim_to(&mut self, len: u64) {
        match self.file.set_len(len).and_then(|_| self.file.sync_all()) {
            Ok(()) => {
                tracing::warn!(path = %self.path.display(), len, "trimmed failed append from event log");
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "could not trim failed append, next record will start a new line"
                );
                self.unsealed = true;
            }
        }
    }

    /// Start a lazy read of every record in append order. Each call starts
    /// again from the first line. Fails with `NotFound` when the file does not
    /// exist yet.
    pub fn read_all(path: &Path) -> Result<LogReader, LogError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LogError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(LogReader {
            reader: BufReader::new(file),
            buf: Vec::new(),
            line: 0,
            done: false,
        })
    }

    /// The last well-formed record in the log, or None when the log holds no
    /// records. Fails with `NotFound` when the file does not exist.
    pub fn latest(path: &Path) -> Result<Option<EventRecord>, LogError> {
        let mut latest = None;
        for item in Self::read_all(path)? {
            match item {
                Ok(record) => latest = Some(record),
                Err(LogError::Corrupt { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(latest)
    }
}

fn ends_mid_line(path: &Path) -> Result<bool, LogError> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Iterator over the records of a JSONL log.
///
/// Yields `Err(LogError::Corrupt)` for a line that is not a JSON object and
/// keeps going. Blank lines are skipped. An I/O failure is yielded once and
/// ends the iteration.
pub struct LogReader {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line: usize,
    done: bool,
}

impl Iterator for LogReader {
    type Item = Result<EventRecord, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                }
                Ok(_) => {
                    self.line += 1;
                    let text = match std::str::from_utf8(&self.buf) {
                        Ok(t) => t.trim(),
                        Err(e) => {
                            return Some(Err(LogError::Corrupt {
                                line: self.line,
                                reason: e.to_string(),
                            }));
                        }
                    };
                    if text.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str::<EventRecord>(text).map_err(|e| {
                        LogError::Corrupt {
                            line: self.line,
                            reason: e.to_string(),
                        }
                    }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(LogError::Io(e)));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn make_record(n: u64) -> EventRecord {
        EventRecord::from_value(json!({
            "system": "CMHP",
            "event": "artwork_record_created",
            "artwork_id": format!("A{}", n),
            "title": format!("Artwork {}", n),
        }))
        .unwrap()
    }

    fn collect_ok(path: &Path) -> Vec<EventRecord> {
        JsonlLog::read_all(path)
            .unwrap()
            .filter_map(Result::ok)
            .collect()
    }

    #[test]
    fn append_and_read_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session_log.jsonl");

        let mut log = JsonlLog::open(&path).unwrap();
        for n in 1..=3 {
            log.append(&make_record(n)).unwrap();
        }

        let records = collect_ok(&path);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].artwork_id(), Some("A1"));
        assert_eq!(records[1].artwork_id(), Some("A2"));
        assert_eq!(records[2].artwork_id(), Some("A3"));
    }

    #[test]
    fn each_record_is_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session_log.jsonl");

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(1)).unwrap();
        log.append(&make_record(2)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with('\n'));
    }

    #[test]
    fn read_all_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.jsonl");

        match JsonlLog::read_all(&path) {
            Err(LogError::NotFound(p)) => assert_eq!(p, path),
            Err(e) => panic!("expected NotFound, got {}", e),
            Ok(_) => panic!("expected NotFound, got a reader"),
        }
    }

    #[test]
    fn read_all_empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.jsonl");
        File::create(&path).unwrap();

        assert_eq!(JsonlLog::read_all(&path).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_line_is_reported_and_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.jsonl");

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(1)).unwrap();
        drop(log);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "[1,2,3]").unwrap();
        drop(file);
        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(2)).unwrap();

        let items: Vec<_> = JsonlLog::read_all(&path).unwrap().collect();
        assert_eq!(items.len(), 4);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(LogError::Corrupt { line: 2, .. })));
        assert!(matches!(items[2], Err(LogError::Corrupt { line: 4, .. })));
        assert_eq!(items[3].as_ref().unwrap().artwork_id(), Some("A2"));
    }

    #[test]
    fn read_all_is_restartable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("restart.jsonl");

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(1)).unwrap();
        log.append(&make_record(2)).unwrap();

        assert_eq!(collect_ok(&path), collect_ok(&path));
    }

    #[test]
    fn open_seals_partial_trailing_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("torn.jsonl");

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(1)).unwrap();
        drop(log);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, r#"{{"system":"CMHP","event":"artwork_rec"#).unwrap();
        drop(file);

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(2)).unwrap();

        let records = collect_ok(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].artwork_id(), Some("A2"));
    }

    #[test]
    fn latest_returns_last_valid_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latest.jsonl");

        assert!(matches!(JsonlLog::latest(&path), Err(LogError::NotFound(_))));

        let log = JsonlLog::open(&path).unwrap();
        assert!(JsonlLog::latest(&path).unwrap().is_none());
        drop(log);

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(1)).unwrap();
        log.append(&make_record(2)).unwrap();
        drop(log);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "garbage").unwrap();
        drop(file);

        let latest = JsonlLog::latest(&path).unwrap().unwrap();
        assert_eq!(latest.artwork_id(), Some("A2"));
    }

    #[test]
    fn failed_append_is_trimmed_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trimmed.jsonl");

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(1)).unwrap();
        let before = fs::read(&path).unwrap();

        log.fault.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = log.append(&make_record(2)).unwrap_err();
        assert!(matches!(err, LogError::Io(_)));
        assert_eq!(fs::read(&path).unwrap(), before, "torn bytes must not remain");

        log.fault.store(false, std::sync::atomic::Ordering::SeqCst);
        log.append(&make_record(3)).unwrap();

        let items: Vec<_> = JsonlLog::read_all(&path).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().artwork_id(), Some("A1"));
        assert_eq!(items[1].as_ref().unwrap().artwork_id(), Some("A3"));
    }

    #[test]
    fn unsealed_log_starts_next_record_on_new_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unsealed.jsonl");

        let mut log = JsonlLog::open(&path).unwrap();
        log.append(&make_record(1)).unwrap();

        // Torn bytes that a failed trim left in place
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, r#"{{"system":"CMHP","event":"#).unwrap();
        drop(file);
        log.unsealed = true;

        log.append(&make_record(2)).unwrap();
        log.append(&make_record(3)).unwrap();

        let items: Vec<_> = JsonlLog::read_all(&path).unwrap().collect();
        assert_eq!(items.len(), 4);
        assert!(matches!(items[1], Err(LogError::Corrupt { line: 2, .. })));
        assert_eq!(items[2].as_ref().unwrap().artwork_id(), Some("A2"));
        assert_eq!(items[3].as_ref().unwrap().artwork_id(), Some("A3"));
        assert!(!log.unsealed);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("log.jsonl");

        let log = JsonlLog::open(&path).unwrap();
        assert_eq!(log.path(), path.as_path());
        assert!(path.exists());
    }
}
