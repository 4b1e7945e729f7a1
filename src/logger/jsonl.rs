//! JSONL activity log: one self-contained JSON object per line.
//!
//! Each record is serialized up front and handed to the sink in one
//! `write_all`, so a concurrent `tail -f` never sees half a record. When the
//! log file cannot be opened or written, output moves to stderr (prefixed
//! `[GTV-JSONL]`) and, if that fails too, is discarded. Logging never stops
//! the viewer.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{GtvError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Activity log event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SourceOpened,
    SourceClosed,
    NoInput,
    DecodeSkipped,
    HistoryStarted,
    HistoryFinished,
    RerunStarted,
    RerunFailed,
    ExportWritten,
    ImportLoaded,
    Error,
}

/// Optional context attached to an entry; unset fields are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDetail {
    /// History name the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// File involved (input, export or import).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Events read, written or recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<u64>,
    /// Input lines that failed to decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<u64>,
    /// Final history state label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A single JSONL record: timestamp, event, severity and flattened detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp, millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(flatten)]
    pub detail: EntryDetail,
}

impl LogEntry {
    /// Entry stamped with the current UTC time and no detail.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self::with_detail(event, severity, EntryDetail::default())
    }

    #[must_use]
    pub fn with_detail(event: EventType, severity: Severity, detail: EntryDetail) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            detail,
        }
    }
}

/// Where the writer currently sends lines.
enum Sink {
    File {
        out: BufWriter<File>,
        size: u64,
    },
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Once the file would grow past this, it moves to `<path>.1` and a
    /// fresh file is started. Default: 10 MiB.
    pub max_bytes: u64,
}

impl JsonlConfig {
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Append-only JSONL writer with one rotated generation.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
}

impl JsonlWriter {
    pub fn open(config: JsonlConfig) -> Self {
        let sink = match open_log_file(&config.path) {
            Ok(sink) => sink,
            Err(err) => {
                let _ = writeln!(io::stderr(), "[GTV-JSONL] {err}; logging to stderr");
                Sink::Stderr
            }
        };
        Self { config, sink }
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.write_line(&line);
            }
            Err(e) => {
                let _ = writeln!(io::stderr(), "[GTV-JSONL] serialize error: {e}");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Sink::File { out, .. } = &mut self.sink {
            let _ = out.flush();
        }
    }

    /// Current sink: `"file"`, `"stderr"` or `"discard"`.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self.sink {
            Sink::File { .. } => "file",
            Sink::Stderr => "stderr",
            Sink::Discard => "discard",
        }
    }

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if let Sink::File { size, .. } = &self.sink
            && *size > 0
            && *size + len > self.config.max_bytes
        {
            self.rotate();
        }

        let failed = match &mut self.sink {
            Sink::File { out, size } => match out.write_all(line.as_bytes()) {
                Ok(()) => {
                    *size += len;
                    false
                }
                Err(_) => true,
            },
            Sink::Stderr => write!(io::stderr(), "[GTV-JSONL] {line}").is_err(),
            Sink::Discard => false,
        };
        if failed {
            self.degrade();
            if matches!(self.sink, Sink::Stderr) {
                let _ = write!(io::stderr(), "[GTV-JSONL] {line}");
            }
        }
    }

    /// file → stderr → discard.
    fn degrade(&mut self) {
        self.sink = match self.sink {
            Sink::File { .. } => {
                let _ = writeln!(io::stderr(), "[GTV-JSONL] log write failed, using stderr");
                Sink::Stderr
            }
            Sink::Stderr | Sink::Discard => Sink::Discard,
        };
    }

    fn rotate(&mut self) {
        self.flush();
        self.sink = Sink::Discard;
        let previous = previous_generation(&self.config.path);
        let _ = fs::rename(&self.config.path, previous);
        self.sink = match open_log_file(&self.config.path) {
            Ok(sink) => sink,
            Err(_) => Sink::Stderr,
        };
    }
}

fn open_log_file(path: &Path) -> Result<Sink> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| GtvError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| GtvError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok(Sink::File {
        out: BufWriter::new(file),
        size,
    })
}

/// `activity.jsonl` → `activity.jsonl.1`.
fn previous_generation(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn entries_are_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig::at(&path));
        assert_eq!(writer.state(), "file");

        let detail = EntryDetail {
            history: Some("Initial".to_string()),
            state: Some("failed".to_string()),
            ..EntryDetail::default()
        };
        writer.write_entry(&LogEntry::with_detail(
            EventType::HistoryFinished,
            Severity::Info,
            detail,
        ));
        writer.write_entry(&LogEntry::new(EventType::SourceClosed, Severity::Info));
        writer.flush();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "history_finished");
        assert_eq!(lines[0]["severity"], "info");
        assert_eq!(lines[0]["history"], "Initial");
        assert_eq!(lines[0]["state"], "failed");
        assert_eq!(lines[1]["event"], "source_closed");
    }

    #[test]
    fn unset_detail_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig::at(&path));
        writer.write_entry(&LogEntry::new(EventType::NoInput, Severity::Warning));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        for key in ["history", "path", "skipped", "details"] {
            assert!(!line.contains(&format!("\"{key}\"")), "{line}");
        }
    }

    #[test]
    fn oversized_log_keeps_one_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig {
            max_bytes: 200,
            ..JsonlConfig::at(&path)
        });
        for _ in 0..20 {
            writer.write_entry(&LogEntry::new(EventType::DecodeSkipped, Severity::Warning));
        }
        writer.flush();

        assert!(previous_generation(&path).exists());
        assert!(fs::metadata(&path).unwrap().len() <= 200);
        assert!(!read_lines(&path).is_empty());
    }

    #[test]
    fn unopenable_path_falls_back_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"file").unwrap();
        let mut writer = JsonlWriter::open(JsonlConfig::at(blocker.join("activity.jsonl")));
        assert_eq!(writer.state(), "stderr");
        writer.write_entry(&LogEntry::new(EventType::Error, Severity::Critical));
        assert_eq!(writer.state(), "stderr");
    }
}
