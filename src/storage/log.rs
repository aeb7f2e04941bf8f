//! Record log for durability
//!
//! Every append is mirrored to a JSON Lines file before it is visible in
//! memory. The log is read once when an index is opened and is never
//! rewritten or truncated.
//!
//! Format per line:
//! - `{"t": <seconds since epoch>, "v": <codec-encoded value>}`, no other keys
//! - terminated by `\n`; blank lines are ignored on load

use crate::storage::codec::CodecError;
use crate::storage::error::{LoadCause, TimeIndexError, TimeIndexResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Sync strategy for log writes
///
/// Both modes hand the full line to the OS before `append` returns; there
/// is no write buffering across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSyncMode {
    /// Fsync after every write (survives power loss)
    EveryWrite,
    /// Flush to the OS after every write (survives process restart)
    Flush,
}

impl Default for LogSyncMode {
    fn default() -> Self {
        LogSyncMode::Flush
    }
}

impl std::fmt::Display for LogSyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSyncMode::EveryWrite => write!(f, "every_write"),
            LogSyncMode::Flush => write!(f, "flush"),
        }
    }
}

impl FromStr for LogSyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "every_write" | "fsync" => Ok(LogSyncMode::EveryWrite),
            "flush" => Ok(LogSyncMode::Flush),
            other => Err(format!(
                "Unknown sync mode: {} (expected every_write or flush)",
                other
            )),
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    t: f64,
    v: &'a Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    t: f64,
    v: Value,
}

/// One decoded line of the log, before the value goes through a codec
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// 1-based line number
    pub line: usize,
    pub t: f64,
    pub v: Value,
}

/// Append-only JSON Lines log
#[derive(Debug)]
pub struct RecordLog {
    /// Path to log file
    path: PathBuf,
    /// Sync mode
    sync_mode: LogSyncMode,
    /// Number of lines written by this handle
    lines_appended: u64,
    /// Existing file does not end in a newline
    missing_newline: bool,
}

impl RecordLog {
    /// Create a handle for a log file
    ///
    /// Performs no I/O; the file and its parent directories are created on
    /// the first append.
    pub fn new(path: impl AsRef<Path>, sync_mode: LogSyncMode) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync_mode,
            lines_appended: 0,
            missing_newline: false,
        }
    }

    /// Open the log for reading, `None` if it does not exist yet
    pub fn read(&mut self) -> TimeIndexResult<Option<LogLines>> {
        if !self.path.exists() {
            return Ok(None);
        }

        self.missing_newline = !Self::ends_with_newline(&self.path)?;
        if self.missing_newline {
            tracing::debug!(path = %self.path.display(), "Log has no trailing newline");
        }

        LogLines::new(&self.path).map(Some)
    }

    fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
        let mut file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(true);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }

    /// Append one record as a single line
    ///
    /// Nothing is considered written unless this returns `Ok`.
    pub fn append(&mut self, t: f64, value: &Value) -> TimeIndexResult<()> {
        let mut line = Vec::with_capacity(64);
        if self.missing_newline {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, &EnvelopeRef { t, v: value })
            .map_err(CodecError::from)?;
        line.push(b'\n');

        self.write_line(&line)
            .map_err(|source| TimeIndexError::Persistence {
                path: self.path.clone(),
                source,
            })?;

        self.missing_newline = false;
        self.lines_appended += 1;
        Ok(())
    }

    fn write_line(&self, line: &[u8]) -> std::io::Result<()> {
        // Create parent directory if needed
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(line)?;

        match self.sync_mode {
            LogSyncMode::EveryWrite => file.sync_data()?,
            LogSyncMode::Flush => file.flush()?,
        }
        Ok(())
    }

    /// Get the path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_mode(&self) -> LogSyncMode {
        self.sync_mode
    }

    /// Number of lines appended through this handle
    pub fn lines_appended(&self) -> u64 {
        self.lines_appended
    }

    /// Get the file size, zero if it does not exist yet
    pub fn file_size(&self) -> TimeIndexResult<u64> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// Line iterator for loading a log
///
/// Yields records in file order, skipping blank lines. A line that is not a
/// valid envelope yields a `Load` error carrying its line number. Lines are
/// read as raw bytes, so invalid UTF-8 is reported the same way.
pub struct LogLines {
    reader: BufReader<File>,
    buf: Vec<u8>,
    path: PathBuf,
    line: usize,
}

impl LogLines {
    pub fn new(path: impl AsRef<Path>) -> TimeIndexResult<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            reader: BufReader::new(file),
            buf: Vec::new(),
            path: path.as_ref().to_path_buf(),
            line: 0,
        })
    }
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

impl Iterator for LogLines {
    type Item = TimeIndexResult<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;

            let text = trim_ascii(&self.buf);
            if text.is_empty() {
                continue;
            }

            let record = serde_json::from_slice::<Envelope>(text)
                .map(|env| LogRecord {
                    line: self.line,
                    t: env.t,
                    v: env.v,
                })
                .map_err(|e| TimeIndexError::Load {
                    path: self.path.clone(),
                    line: self.line,
                    cause: LoadCause::Envelope(e),
                });
            return Some(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_log_basic_operations() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.jsonl");

        // Create and write
        {
            let mut log = RecordLog::new(&log_path, LogSyncMode::EveryWrite);
            assert!(log.read().unwrap().is_none());

            log.append(1000.0, &json!({"value": 7.5})).unwrap();
            log.append(2000.0, &json!({"value": 8.0})).unwrap();

            assert_eq!(log.lines_appended(), 2);
        }

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(
            content,
            "{\"t\":1000.0,\"v\":{\"value\":7.5}}\n{\"t\":2000.0,\"v\":{\"value\":8.0}}\n"
        );

        // Read back
        {
            let mut log = RecordLog::new(&log_path, LogSyncMode::EveryWrite);
            let records: Vec<LogRecord> = log
                .read()
                .unwrap()
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();

            assert_eq!(records.len(), 2);
            assert_eq!(records[0].line, 1);
            assert_eq!(records[0].t, 1000.0);
            assert_eq!(records[1].v, json!({"value": 8.0}));
        }
    }

    #[test]
    fn test_log_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("deeper").join("log.jsonl");

        let mut log = RecordLog::new(&log_path, LogSyncMode::Flush);
        assert_eq!(log.file_size().unwrap(), 0);

        log.append(1.0, &json!(null)).unwrap();
        assert!(log_path.exists());
        assert!(log.file_size().unwrap() > 0);
    }

    #[test]
    fn test_log_skips_blank_lines_and_counts_them() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.jsonl");
        std::fs::write(
            &log_path,
            "{\"t\":1,\"v\":1}\n\n   \n{\"t\":2,\"v\":2}\n\n",
        )
        .unwrap();

        let records: Vec<LogRecord> = LogLines::new(&log_path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[1].line, 4);
        assert_eq!(records[1].t, 2.0);
    }

    #[test]
    fn test_log_malformed_line_reports_position() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.jsonl");
        std::fs::write(&log_path, "{\"t\":1,\"v\":1}\n{\"t\":2}\n").unwrap();

        let mut lines = LogLines::new(&log_path).unwrap();
        assert!(lines.next().unwrap().is_ok());

        match lines.next().unwrap() {
            Err(TimeIndexError::Load { path, line, cause }) => {
                assert_eq!(path, log_path);
                assert_eq!(line, 2);
                assert!(matches!(cause, LoadCause::Envelope(_)));
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_log_rejects_invalid_utf8_and_extra_fields() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.jsonl");

        let mut content = b"{\"t\":1.0,\"v\":1}\n{\"t\":2.0,\"v\":\"".to_vec();
        content.extend_from_slice(&[0xff, 0xfe]);
        content.extend_from_slice(b"\"}\n");
        std::fs::write(&log_path, &content).unwrap();

        let mut lines = LogLines::new(&log_path).unwrap();
        assert_eq!(lines.next().unwrap().unwrap().t, 1.0);
        assert!(matches!(
            lines.next().unwrap(),
            Err(TimeIndexError::Load { line: 2, cause: LoadCause::Envelope(_), .. })
        ));

        std::fs::write(&log_path, "{\"t\":1.0,\"v\":1,\"id\":7}\n").unwrap();
        let mut lines = LogLines::new(&log_path).unwrap();
        assert!(matches!(
            lines.next().unwrap(),
            Err(TimeIndexError::Load { line: 1, .. })
        ));
    }

    #[test]
    fn test_log_repairs_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.jsonl");
        std::fs::write(&log_path, "{\"t\":1.0,\"v\":1}").unwrap();

        let mut log = RecordLog::new(&log_path, LogSyncMode::Flush);
        let existing = log.read().unwrap().unwrap().count();
        assert_eq!(existing, 1);

        log.append(2.0, &json!(2)).unwrap();

        let records: Vec<LogRecord> = LogLines::new(&log_path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].t, 2.0);
    }

    #[test]
    fn test_log_append_failure_is_persistence_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut log = RecordLog::new(blocker.join("log.jsonl"), LogSyncMode::Flush);
        let err = log.append(1.0, &json!(1)).unwrap_err();

        assert!(matches!(err, TimeIndexError::Persistence { .. }));
        assert_eq!(log.lines_appended(), 0);
    }

    #[test]
    fn test_sync_mode_parse() {
        assert_eq!("flush".parse::<LogSyncMode>(), Ok(LogSyncMode::Flush));
        assert_eq!("every-write".parse::<LogSyncMode>(), Ok(LogSyncMode::EveryWrite));
        assert_eq!("fsync".parse::<LogSyncMode>(), Ok(LogSyncMode::EveryWrite));
        assert!("sometimes".parse::<LogSyncMode>().is_err());
        assert_eq!(LogSyncMode::default(), LogSyncMode::Flush);
    }
}
