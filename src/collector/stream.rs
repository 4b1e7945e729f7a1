//! Line-oriented `go test -json` streams and export/import files.

#![allow(missing_docs)]

use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use crossbeam_channel::Sender;

use crate::core::errors::{GtvError, Result};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::model::event::{TestEvent, decode_event};

/// Counters for one consumed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Events decoded and forwarded.
    pub events: u64,
    /// Non-blank lines that failed to decode.
    pub skipped: u64,
}

/// Events loaded from an export file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedEvents {
    pub path: PathBuf,
    pub events: Vec<TestEvent>,
    pub skipped: u64,
}

/// Decode `reader` line by line and forward events into `tx`.
///
/// Sends block when the channel is full, so a slow consumer throttles the
/// reader instead of losing events. Malformed lines are logged and counted,
/// blank lines are ignored. A receiver that is gone mid-stream is a
/// [`GtvError::ChannelClosed`].
pub fn read_event_stream<R: BufRead>(
    mut reader: R,
    source: &str,
    tx: &Sender<TestEvent>,
    logger: &ActivityLoggerHandle,
) -> Result<StreamStats> {
    let mut stats = StreamStats::default();
    let mut line = Vec::with_capacity(512);
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source_err| GtvError::io(source, source_err))?;
        if read == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match decode_event(&line) {
            Ok(event) => {
                tx.send(event).map_err(|_| GtvError::ChannelClosed {
                    component: "ingest worker",
                })?;
                stats.events += 1;
            }
            Err(err) => {
                stats.skipped += 1;
                logger.send(ActivityEvent::DecodeSkipped {
                    source: source.to_string(),
                    details: err.to_string(),
                });
            }
        }
    }
    Ok(stats)
}

/// Write `events` as NDJSON, one event per line, replacing `path`.
pub fn export_events(path: &Path, events: &[TestEvent]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| GtvError::io(parent, source))?;
    }
    let file = File::create(path).map_err(|source| GtvError::io(path, source))?;
    let mut out = BufWriter::new(file);
    for event in events {
        serde_json::to_writer(&mut out, event)?;
        out.write_all(b"\n")
            .map_err(|source| GtvError::io(path, source))?;
    }
    out.flush().map_err(|source| GtvError::io(path, source))
}

/// Load an NDJSON export. Lines that do not decode are skipped and counted.
pub fn import_events(path: &Path) -> Result<ImportedEvents> {
    let file = File::open(path).map_err(|source| GtvError::io(path, source))?;
    let mut reader = BufReader::new(file);
    let mut imported = ImportedEvents {
        path: path.to_path_buf(),
        ..ImportedEvents::default()
    };
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| GtvError::io(path, source))?;
        if read == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match decode_event(&line) {
            Ok(event) => imported.events.push(event),
            Err(_) => imported.skipped += 1,
        }
    }
    Ok(imported)
}

/// `<prefix>-YYYYMMDD-HHMMSS.json` for an export taken at `now`.
pub fn export_file_name<Tz>(now: &DateTime<Tz>, prefix: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{prefix}-{}.json", now.format("%Y%m%d-%H%M%S"))
}
