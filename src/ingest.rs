//! Ingestion coordinator.
//!
//! Each History gets one worker thread that drains its event channel and
//! records events under the History's own lock. Workers never touch the
//! UI; they push owned [`IngestUpdate`] messages onto a shared bounded
//! queue that the render loop drains between frames. A consumer that falls
//! behind stalls the workers, which in turn stall the readers.
//!
//! ```text
//! source reader ──bounded──▶ ingest worker (History 0) ──┐
//! go executor   ──bounded──▶ ingest worker (History n) ──┴─bounded─▶ render loop
//! ```

#![allow(missing_docs)]

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::collector::runner::{RunOutcome, TestExecutor};
use crate::collector::stream::{StreamStats, read_event_stream};
use crate::core::errors::{GtvError, Result};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::model::event::TestEvent;
use crate::session::history::{History, HistoryState, RecordOutcome};
use crate::session::manager::HistoryManager;
use crate::session::rerun::RerunTarget;

/// Message from a background thread to the render loop.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestUpdate {
    /// An event was recorded into history `history`.
    Recorded {
        history: usize,
        outcome: RecordOutcome,
    },
    /// History `history` settled after its source closed.
    Finished {
        history: usize,
        state: HistoryState,
    },
    /// The primary source had nothing to read.
    NoInput { message: String },
    /// The primary source ended normally.
    SourceClosed { stats: StreamStats },
    /// The primary source hit an unrecoverable I/O error.
    SourceFailed { message: String },
    /// A rerun could not execute; other histories are unaffected.
    RerunFailed { history: usize, message: String },
}

/// Where the primary stream comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// `go test -json` piped into stdin.
    Stdin,
    /// Events loaded from an export file before ingestion starts.
    Events { label: String, events: Vec<TestEvent> },
}

impl InputSource {
    fn label(&self) -> &str {
        match self {
            Self::Stdin => "stdin",
            Self::Events { label, .. } => label,
        }
    }
}

// ──────────────────── history workers ────────────────────

/// Mark `history` Running and start draining `rx` into it.
///
/// The worker ends when every sender of `rx` is dropped and the buffered
/// events are recorded; it then finalizes the History exactly once and
/// returns the settled state.
pub fn spawn_history_ingest(
    history: Arc<History>,
    rx: Receiver<TestEvent>,
    updates: Sender<IngestUpdate>,
    logger: ActivityLoggerHandle,
) -> Result<JoinHandle<HistoryState>> {
    history.start();
    logger.send(ActivityEvent::HistoryStarted {
        history: history.name().to_string(),
    });

    thread::Builder::new()
        .name(format!("gtv-ingest-{}", history.id()))
        .spawn(move || {
            let id = history.id();
            for event in &rx {
                let outcome = history.record(event);
                let _ = updates.send(IngestUpdate::Recorded {
                    history: id,
                    outcome,
                });
            }

            let state = history.finalize();
            logger.send(ActivityEvent::HistoryFinished {
                history: history.name().to_string(),
                state: state_label(state).to_string(),
                events: history.event_count() as u64,
            });
            let _ = updates.send(IngestUpdate::Finished { history: id, state });
            state
        })
        .map_err(|e| GtvError::Runtime {
            details: format!("failed to spawn ingest worker: {e}"),
        })
}

#[must_use]
pub const fn state_label(state: HistoryState) -> &'static str {
    match state {
        HistoryState::Idle => "idle",
        HistoryState::Running => "running",
        HistoryState::Completed => "completed",
        HistoryState::Failed => "failed",
    }
}

// ──────────────────── primary source ────────────────────

/// Start the primary source reader feeding `tx`.
///
/// Stdin that is a terminal counts as no input: it is reported once and the
/// sender is dropped so the initial History settles empty.
pub fn spawn_source_reader(
    source: InputSource,
    tx: Sender<TestEvent>,
    updates: Sender<IngestUpdate>,
    logger: ActivityLoggerHandle,
) -> Result<JoinHandle<Result<StreamStats>>> {
    thread::Builder::new()
        .name("gtv-source".to_string())
        .spawn(move || {
            let label = source.label().to_string();
            let result = match source {
                InputSource::Stdin if io::stdin().is_terminal() => {
                    let message = no_input_message();
                    logger.send(ActivityEvent::NoInput {
                        details: message.clone(),
                    });
                    let _ = updates.send(IngestUpdate::NoInput { message });
                    return Ok(StreamStats::default());
                }
                InputSource::Stdin => {
                    logger.send(ActivityEvent::SourceOpened {
                        source: label.clone(),
                    });
                    read_event_stream(io::stdin().lock(), &label, &tx, &logger)
                }
                InputSource::Events { events, .. } => {
                    logger.send(ActivityEvent::SourceOpened {
                        source: label.clone(),
                    });
                    forward_events(events, &tx)
                }
            };
            drop(tx);

            match &result {
                Ok(stats) => {
                    logger.send(ActivityEvent::SourceClosed {
                        source: label,
                        events: stats.events,
                        skipped: stats.skipped,
                    });
                    let _ = updates.send(IngestUpdate::SourceClosed { stats: *stats });
                }
                Err(err) => {
                    logger.send(ActivityEvent::Error {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                    let _ = updates.send(IngestUpdate::SourceFailed {
                        message: err.to_string(),
                    });
                }
            }
            result
        })
        .map_err(|e| GtvError::Runtime {
            details: format!("failed to spawn source reader: {e}"),
        })
}

fn no_input_message() -> String {
    GtvError::NoInput {
        details: "no piped input detected; usage: go test -json ./... | gtv".to_string(),
    }
    .to_string()
}

fn forward_events(events: Vec<TestEvent>, tx: &Sender<TestEvent>) -> Result<StreamStats> {
    let mut stats = StreamStats::default();
    for event in events {
        tx.send(event).map_err(|_| GtvError::ChannelClosed {
            component: "ingest worker",
        })?;
        stats.events += 1;
    }
    Ok(stats)
}

/// Threads serving the primary stream.
#[derive(Debug)]
pub struct PrimaryIngest {
    pub history: Arc<History>,
    pub reader: JoinHandle<Result<StreamStats>>,
    pub worker: JoinHandle<HistoryState>,
}

/// Create the initial History and wire `source` into it through a bounded
/// channel of `capacity`.
pub fn start_primary(
    manager: &mut HistoryManager,
    source: InputSource,
    capacity: usize,
    updates: &Sender<IngestUpdate>,
    logger: &ActivityLoggerHandle,
) -> Result<PrimaryIngest> {
    let history = manager.add_history("Initial");
    let (tx, rx) = bounded(capacity);
    let worker = spawn_history_ingest(
        Arc::clone(&history),
        rx,
        updates.clone(),
        logger.clone(),
    )?;
    let reader = spawn_source_reader(source, tx, updates.clone(), logger.clone())?;
    Ok(PrimaryIngest {
        history,
        reader,
        worker,
    })
}

// ──────────────────── reruns ────────────────────

/// Everything needed to launch reruns.
#[derive(Clone)]
pub struct RerunLauncher {
    executor: Arc<dyn TestExecutor>,
    capacity: usize,
    updates: Sender<IngestUpdate>,
    logger: ActivityLoggerHandle,
}

impl std::fmt::Debug for RerunLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerunLauncher")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Threads serving one rerun.
#[derive(Debug)]
pub struct RerunHandles {
    pub history: Arc<History>,
    pub executor: JoinHandle<()>,
    pub worker: JoinHandle<HistoryState>,
}

impl RerunLauncher {
    pub fn new(
        executor: Arc<dyn TestExecutor>,
        capacity: usize,
        updates: Sender<IngestUpdate>,
        logger: ActivityLoggerHandle,
    ) -> Self {
        Self {
            executor,
            capacity,
            updates,
            logger,
        }
    }

    /// Create a new History for `target`, select it and start executing.
    ///
    /// Execution failures arrive later as [`IngestUpdate::RerunFailed`];
    /// the History still settles once the executor drops its sender.
    pub fn launch(
        &self,
        manager: &mut HistoryManager,
        target: RerunTarget,
    ) -> Result<RerunHandles> {
        let history = manager.add_history(target.history_name());
        let (tx, rx) = bounded(self.capacity);
        let worker = spawn_history_ingest(
            Arc::clone(&history),
            rx,
            self.updates.clone(),
            self.logger.clone(),
        )?;

        self.logger.send(ActivityEvent::RerunStarted {
            history: history.name().to_string(),
            package: target.package().to_string(),
            test: match &target {
                RerunTarget::Package(_) => None,
                RerunTarget::Test(key) => Some(key.name.clone()),
            },
        });

        let executor = Arc::clone(&self.executor);
        let updates = self.updates.clone();
        let logger = self.logger.clone();
        let id = history.id();
        let name = history.name().to_string();
        let executor = thread::Builder::new()
            .name(format!("gtv-rerun-{id}"))
            .spawn(move || match executor.run(&target, tx) {
                Ok(RunOutcome::Passed | RunOutcome::TestsFailed) => {}
                Err(err) => {
                    logger.send(ActivityEvent::RerunFailed {
                        history: name,
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                    let _ = updates.send(IngestUpdate::RerunFailed {
                        history: id,
                        message: format!("Rerun failed: {err}"),
                    });
                }
            })
            .map_err(|e| GtvError::Runtime {
                details: format!("failed to spawn rerun executor: {e}"),
            })?;

        Ok(RerunHandles {
            history,
            executor,
            worker,
        })
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::model::event::Action;
    use crate::model::tree::TestKey;

    fn events(test: &str, last: Action) -> Vec<TestEvent> {
        vec![
            TestEvent::new(Action::Run, "pkg/A", test),
            TestEvent::new(Action::Output, "pkg/A", test).with_output("log\n"),
            TestEvent::new(last, "pkg/A", test).with_elapsed(0.01),
        ]
    }

    #[test]
    fn worker_drains_then_finalizes_once() {
        let history = Arc::new(History::new(0, "Initial"));
        let (tx, rx) = bounded(2);
        let (utx, urx) = unbounded();
        let worker = spawn_history_ingest(
            Arc::clone(&history),
            rx,
            utx,
            ActivityLoggerHandle::disabled(),
        )
        .unwrap();
        assert_eq!(history.state(), HistoryState::Running);

        for event in events("TestA", Action::Fail) {
            tx.send(event).unwrap();
        }
        drop(tx);
        assert_eq!(worker.join().unwrap(), HistoryState::Failed);

        let updates: Vec<IngestUpdate> = urx.iter().collect();
        assert_eq!(updates.len(), 4);
        assert!(matches!(
            updates.last(),
            Some(IngestUpdate::Finished {
                history: 0,
                state: HistoryState::Failed
            })
        ));
        assert_eq!(history.event_count(), 3);
    }

    #[test]
    fn imported_events_feed_initial_history() {
        let mut manager = HistoryManager::new();
        let (utx, urx) = unbounded();
        let source = InputSource::Events {
            label: "run.json".to_string(),
            events: events("TestA", Action::Pass),
        };
        let primary =
            start_primary(&mut manager, source, 1, &utx, &ActivityLoggerHandle::disabled())
                .unwrap();
        drop(utx);

        let stats = primary.reader.join().unwrap().unwrap();
        assert_eq!(stats.events, 3);
        assert_eq!(primary.worker.join().unwrap(), HistoryState::Completed);
        assert_eq!(manager.current().unwrap().name(), "Initial");
        assert!(
            urx.iter()
                .any(|u| matches!(u, IngestUpdate::SourceClosed { .. }))
        );
    }

    #[test]
    fn stalled_consumer_keeps_update_queue_bounded() {
        let mut manager = HistoryManager::new();
        let (utx, urx) = bounded(8);
        let source = InputSource::Events {
            label: "big.json".to_string(),
            events: (0..2000)
                .map(|i| {
                    TestEvent::new(Action::Output, "pkg/A", "TestA")
                        .with_output(format!("{i}\n"))
                })
                .collect(),
        };
        let primary =
            start_primary(&mut manager, source, 4, &utx, &ActivityLoggerHandle::disabled())
                .unwrap();
        drop(utx);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !urx.is_full() && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(1));
        }
        thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(urx.len(), 8);
        assert!(primary.history.event_count() <= 9);
        assert!(!primary.reader.is_finished());
        assert!(!primary.worker.is_finished());

        let drained = urx.iter().count();
        assert_eq!(drained, 2002);
        assert_eq!(primary.reader.join().unwrap().unwrap().events, 2000);
        assert_eq!(primary.worker.join().unwrap(), HistoryState::Completed);
    }

    #[test]
    fn forwarding_to_a_gone_worker_fails() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let err = forward_events(events("TestA", Action::Pass), &tx).unwrap_err();
        assert_eq!(err.code(), "GTV-3003");
        assert!(err.is_fatal());
    }

    #[test]
    fn no_input_message_carries_code_and_usage() {
        let message = no_input_message();
        assert!(message.starts_with("[GTV-3101] no input: "), "{message}");
        assert!(message.contains("go test -json ./... | gtv"), "{message}");
    }

    struct ScriptedExecutor(Vec<TestEvent>);

    impl TestExecutor for ScriptedExecutor {
        fn run(&self, _target: &RerunTarget, tx: Sender<TestEvent>) -> Result<RunOutcome> {
            for event in &self.0 {
                let _ = tx.send(event.clone());
            }
            Ok(RunOutcome::TestsFailed)
        }
    }

    struct BrokenExecutor;

    impl TestExecutor for BrokenExecutor {
        fn run(&self, _target: &RerunTarget, _tx: Sender<TestEvent>) -> Result<RunOutcome> {
            Err(GtvError::Execution {
                details: "go: executable file not found".to_string(),
            })
        }
    }

    #[test]
    fn rerun_gets_its_own_history() {
        let mut manager = HistoryManager::new();
        let initial = manager.add_history("Initial");
        let (utx, urx) = unbounded();
        let launcher = RerunLauncher::new(
            Arc::new(ScriptedExecutor(events("TestA", Action::Pass))),
            100,
            utx,
            ActivityLoggerHandle::disabled(),
        );

        let target = RerunTarget::Test(TestKey::new("pkg/A", "TestA"));
        let handles = launcher.launch(&mut manager, target).unwrap();
        handles.executor.join().unwrap();
        assert_eq!(handles.worker.join().unwrap(), HistoryState::Completed);

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.current_index(), 1);
        assert_eq!(handles.history.name(), "Rerun: TestA");
        assert_eq!(handles.history.event_count(), 3);
        assert_eq!(initial.event_count(), 0);
        assert!(urx.try_iter().all(|u| match u {
            IngestUpdate::Recorded { history, .. } | IngestUpdate::Finished { history, .. } =>
                history == 1,
            _ => false,
        }));
    }

    #[test]
    fn failed_rerun_reports_and_settles() {
        let mut manager = HistoryManager::new();
        manager.add_history("Initial");
        let (utx, urx) = unbounded();
        let launcher = RerunLauncher::new(
            Arc::new(BrokenExecutor),
            100,
            utx,
            ActivityLoggerHandle::disabled(),
        );
        let handles = launcher
            .launch(&mut manager, RerunTarget::Package("pkg/A".to_string()))
            .unwrap();
        handles.executor.join().unwrap();
        assert_eq!(handles.worker.join().unwrap(), HistoryState::Completed);
        assert_eq!(handles.history.name(), "Rerun: pkg A");

        let failure = urx
            .try_iter()
            .find_map(|u| match u {
                IngestUpdate::RerunFailed { history, message } => Some((history, message)),
                _ => None,
            })
            .unwrap();
        assert_eq!(failure.0, 1);
        assert!(failure.1.starts_with("Rerun failed: [GTV-4001]"));
    }
}
