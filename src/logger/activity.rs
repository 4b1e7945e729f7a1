//! Activity logger: a dedicated thread owns the `JsonlWriter`.
//!
//! Every other thread sends `ActivityEvent`s through a bounded crossbeam
//! channel with `try_send()`, so ingestion and rendering are never blocked
//! by logging back-pressure. Drops are counted and reported in-band.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{GtvError, Result};
use crate::logger::jsonl::{
    EntryDetail, EventType, JsonlConfig, JsonlWriter, LogEntry, Severity,
};

// ──────────────────── channel capacity ────────────────────

const CHANNEL_CAPACITY: usize = 1024;

// ──────────────────── public event type ────────────────────

#[derive(Debug, Clone)]
pub enum ActivityEvent {
    SourceOpened {
        source: String,
    },
    SourceClosed {
        source: String,
        events: u64,
        skipped: u64,
    },
    NoInput {
        details: String,
    },
    DecodeSkipped {
        source: String,
        details: String,
    },
    HistoryStarted {
        history: String,
    },
    HistoryFinished {
        history: String,
        state: String,
        events: u64,
    },
    RerunStarted {
        history: String,
        package: String,
        test: Option<String>,
    },
    RerunFailed {
        history: String,
        code: String,
        message: String,
    },
    ExportWritten {
        history: String,
        path: PathBuf,
        events: u64,
    },
    ImportLoaded {
        path: PathBuf,
        events: u64,
        skipped: u64,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

// ──────────────────── public handle ────────────────────

/// Cheaply cloneable handle for sending log events from any thread.
#[derive(Debug, Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Handle whose events go nowhere. Used when logging is off and in tests.
    #[must_use]
    pub fn disabled() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Send an event without blocking. A full channel drops the event and
    /// bumps the dropped counter.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and stop. Blocks only if the channel
    /// is full.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

// ──────────────────── configuration ────────────────────

#[derive(Debug, Clone)]
pub struct ActivityLoggerConfig {
    pub jsonl_config: JsonlConfig,
    pub channel_capacity: usize,
}

impl ActivityLoggerConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            jsonl_config: JsonlConfig::at(path),
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread and return a handle to it.
///
/// The thread runs until `shutdown()` is called or every handle is dropped.
pub fn spawn_logger(
    config: ActivityLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("gtv-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config.jsonl_config, &dropped_clone))
        .map_err(|e| GtvError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

// ──────────────────── logger thread ────────────────────

fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            jsonl.write_entry(&LogEntry::with_detail(
                EventType::Error,
                Severity::Warning,
                EntryDetail {
                    details: Some(format!("{d} log events dropped due to back-pressure")),
                    ..EntryDetail::default()
                },
            ));
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(event));
    }

    jsonl.flush();
}

// ──────────────────── event conversion ────────────────────

fn event_to_log_entry(event: ActivityEvent) -> LogEntry {
    let (event_type, severity, detail) = match event {
        ActivityEvent::SourceOpened { source } => (
            EventType::SourceOpened,
            Severity::Info,
            EntryDetail {
                path: Some(source),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::SourceClosed {
            source,
            events,
            skipped,
        } => (
            EventType::SourceClosed,
            Severity::Info,
            EntryDetail {
                path: Some(source),
                events: Some(events),
                skipped: Some(skipped),
                ok: Some(true),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::NoInput { details } => (
            EventType::NoInput,
            Severity::Warning,
            EntryDetail {
                details: Some(details),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::DecodeSkipped { source, details } => (
            EventType::DecodeSkipped,
            Severity::Warning,
            EntryDetail {
                path: Some(source),
                error_code: Some("GTV-2001".to_string()),
                details: Some(details),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::HistoryStarted { history } => (
            EventType::HistoryStarted,
            Severity::Info,
            EntryDetail {
                history: Some(history),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::HistoryFinished {
            history,
            state,
            events,
        } => (
            EventType::HistoryFinished,
            Severity::Info,
            EntryDetail {
                ok: Some(state != "failed"),
                history: Some(history),
                state: Some(state),
                events: Some(events),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::RerunStarted {
            history,
            package,
            test,
        } => (
            EventType::RerunStarted,
            Severity::Info,
            EntryDetail {
                history: Some(history),
                package: Some(package),
                test,
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::RerunFailed {
            history,
            code,
            message,
        } => (
            EventType::RerunFailed,
            Severity::Warning,
            EntryDetail {
                history: Some(history),
                ok: Some(false),
                error_code: Some(code),
                error_message: Some(message),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::ExportWritten {
            history,
            path,
            events,
        } => (
            EventType::ExportWritten,
            Severity::Info,
            EntryDetail {
                history: Some(history),
                path: Some(path.display().to_string()),
                events: Some(events),
                ok: Some(true),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::ImportLoaded {
            path,
            events,
            skipped,
        } => (
            EventType::ImportLoaded,
            Severity::Info,
            EntryDetail {
                path: Some(path.display().to_string()),
                events: Some(events),
                skipped: Some(skipped),
                ok: Some(true),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::Error { code, message } => (
            EventType::Error,
            Severity::Critical,
            EntryDetail {
                ok: Some(false),
                error_code: Some(code),
                error_message: Some(message),
                ..EntryDetail::default()
            },
        ),
        ActivityEvent::Shutdown => (
            EventType::SourceClosed,
            Severity::Info,
            EntryDetail::default(),
        ),
    };
    LogEntry::with_detail(event_type, severity, detail)
}

// ──────────────────── tests ────────────────────
