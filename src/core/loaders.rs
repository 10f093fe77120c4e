//! Log loading, indexing and status replay.
//!
//! A log is a newline-delimited JSON file named `<prefix>.json`. Every
//! message carries a `time` in seconds and may carry a `status` delta:
//!
//! ```text
//! {"time": 1520.25, "status": {"toolhead": {"position": [10.0, 5.0, 0.2, 0.0]}}}
//! {"time": 1520.26, "status": {"extruder": {"temperature": 210.4}}}
//! ```
//!
//! Deltas are merged per object into a running status. The loader builds a
//! coarse time index holding full status snapshots, so that seeking into the
//! log does not require replaying it from the start.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Seconds of log time between index snapshots.
pub const INDEX_INTERVAL: f64 = 1.0;

/// Raw dataset kinds served directly from log status.
pub const RAW_DATASET_TYPES: &[&str] = &["status"];

/// Merged status: object name -> field map.
pub type StatusMap = Map<String, Value>;

/// Errors that can occur while reading a log.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("failed to read log '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log message at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no timed messages in log: {0}")]
    EmptyLog(PathBuf),

    #[error("log index has not been built")]
    NotIndexed,

    #[error("invalid seek time: {0}")]
    InvalidSeek(f64),
}

/// Result type for log operations.
pub type Result<T> = std::result::Result<T, LogError>;

/// Time-seekable source of log status.
pub trait LogSource {
    /// Open the log identified by `prefix`.
    fn open(prefix: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Scan the log once, recording its start time and status snapshots.
    fn build_index(&mut self) -> Result<()>;

    /// Position the reader `skip` seconds after the start of the log.
    fn seek(&mut self, skip: f64) -> Result<()>;

    /// Absolute time of the first message.
    fn initial_start_time(&self) -> f64;

    /// Absolute time the reader was seeked to.
    fn start_time(&self) -> f64;

    /// Apply all messages up to `req_time` and return the merged status.
    ///
    /// Requests must be non-decreasing; the reader never rewinds.
    fn pull_status(&mut self, req_time: f64) -> Result<&StatusMap>;
}

#[derive(Debug, Deserialize)]
struct LogMessage {
    time: f64,
    #[serde(default)]
    status: Option<StatusMap>,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    /// Time of the message at `offset`.
    time: f64,
    offset: u64,
    /// Lines preceding `offset`.
    line: usize,
    /// Status before the message at `offset` is applied.
    status: StatusMap,
}

/// File-backed [`LogSource`].
pub struct LogManager {
    path: PathBuf,
    reader: BufReader<File>,
    index: Vec<IndexEntry>,
    initial_start_time: f64,
    start_time: f64,
    positioned: bool,
    state: StatusMap,
    pending: Option<LogMessage>,
    offset: u64,
    line_no: usize,
    line_buf: String,
}

impl LogManager {
    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn rewind_to(&mut self, offset: u64, line: usize) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.io_error(e))?;
        self.offset = offset;
        self.line_no = line;
        self.pending = None;
        Ok(())
    }

    /// Read the next timed message, returning it with its starting offset.
    fn read_message(&mut self) -> Result<Option<(u64, LogMessage)>> {
        loop {
            let start = self.offset;
            self.line_buf.clear();
            let read = match self.reader.read_line(&mut self.line_buf) {
                Ok(n) => n,
                Err(e) => return Err(self.io_error(e)),
            };
            if read == 0 {
                return Ok(None);
            }
            self.offset += read as u64;
            self.line_no += 1;

            let line = self.line_buf.trim();
            if line.is_empty() {
                continue;
            }
            let msg: LogMessage = serde_json::from_str(line).map_err(|e| LogError::Parse {
                line: self.line_no,
                source: e,
            })?;
            return Ok(Some((start, msg)));
        }
    }
}

impl LogSource for LogManager {
    fn open(prefix: &Path) -> Result<Self> {
        let mut path = prefix.as_os_str().to_os_string();
        path.push(".json");
        let path = PathBuf::from(path);

        let file = File::open(&path).map_err(|e| LogError::Io {
            path: path.clone(),
            source: e,
        })?;
        info!("Opened log {}", path.display());

        Ok(Self {
            path,
            reader: BufReader::with_capacity(64 * 1024, file),
            index: Vec::new(),
            initial_start_time: 0.0,
            start_time: 0.0,
            positioned: false,
            state: StatusMap::new(),
            pending: None,
            offset: 0,
            line_no: 0,
            line_buf: String::with_capacity(512),
        })
    }

    fn build_index(&mut self) -> Result<()> {
        self.rewind_to(0, 0)?;
        self.index.clear();
        self.positioned = false;

        let mut status = StatusMap::new();
        let mut next_index_time = f64::NEG_INFINITY;
        let mut messages = 0usize;

        while let Some((offset, msg)) = self.read_message()? {
            if msg.time >= next_index_time {
                self.index.push(IndexEntry {
                    time: msg.time,
                    offset,
                    line: self.line_no - 1,
                    status: status.clone(),
                });
                next_index_time = msg.time + INDEX_INTERVAL;
            }
            if let Some(delta) = msg.status {
                merge_status(&mut status, delta);
            }
            messages += 1;
        }

        let first = self
            .index
            .first()
            .ok_or_else(|| LogError::EmptyLog(self.path.clone()))?;
        self.initial_start_time = first.time;
        self.start_time = first.time;

        info!(
            "Indexed {} messages ({} snapshots) in {}",
            messages,
            self.index.len(),
            self.path.display()
        );
        Ok(())
    }

    fn seek(&mut self, skip: f64) -> Result<()> {
        if self.index.is_empty() {
            return Err(LogError::NotIndexed);
        }
        if !skip.is_finite() || skip < 0.0 {
            return Err(LogError::InvalidSeek(skip));
        }

        let target = self.initial_start_time + skip;
        let pos = self
            .index
            .partition_point(|entry| entry.time <= target)
            .saturating_sub(1);
        let entry = self.index[pos].clone();
        debug!(
            "Seek to {:.6} starts from snapshot at {:.6} (line {})",
            target,
            entry.time,
            entry.line + 1
        );

        self.rewind_to(entry.offset, entry.line)?;
        self.state = entry.status;
        self.start_time = target;
        self.positioned = true;
        Ok(())
    }

    fn initial_start_time(&self) -> f64 {
        self.initial_start_time
    }

    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn pull_status(&mut self, req_time: f64) -> Result<&StatusMap> {
        if !self.positioned {
            return Err(LogError::NotIndexed);
        }
        loop {
            let msg = match self.pending.take() {
                Some(msg) => msg,
                None => match self.read_message()? {
                    Some((_, msg)) => msg,
                    None => break,
                },
            };
            if msg.time > req_time {
                self.pending = Some(msg);
                break;
            }
            match msg.status {
                Some(delta) => merge_status(&mut self.state, delta),
                None => debug!("Skipping message without status at {:.6}", msg.time),
            }
        }
        Ok(&self.state)
    }
}

/// Merge a status delta into `state`, one object at a time.
pub fn merge_status(state: &mut StatusMap, delta: StatusMap) {
    for (object, fields) in delta {
        match fields {
            Value::Object(update) => match state.get_mut(&object) {
                Some(Value::Object(existing)) => existing.extend(update),
                _ => {
                    state.insert(object, Value::Object(update));
                }
            },
            other => {
                state.insert(object, other);
            }
        }
    }
}

/// Look up a period separated field path in a status map.
///
/// Object members are matched by name and array elements by decimal index,
/// so `toolhead.position.2` selects the Z coordinate.
pub fn lookup_status_field<'a, S: AsRef<str>>(status: &'a StatusMap, parts: &[S]) -> Option<&'a Value> {
    let (first, rest) = parts.split_first()?;
    let mut value = status.get(first.as_ref())?;
    for part in rest {
        let part = part.as_ref();
        value = match value {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// Numeric form of a status value; `NaN` when it has none.
pub fn value_to_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

/// Strip a `.json` or `.index.json` suffix from a log name.
pub fn normalize_log_prefix(name: &str) -> &str {
    name.strip_suffix(".index.json")
        .or_else(|| name.strip_suffix(".json"))
        .unwrap_or(name)
}

/// Raw datasets served by the log loader.
pub fn list_datasets() -> Vec<(&'static str, &'static str)> {
    vec![(
        "status(<field>)",
        "A get_status field name (separate by periods)",
    )]
}
