//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{ColoredString, Colorize, control};
use crossbeam_channel::{Receiver, bounded};
use thiserror::Error;

use gotestview::collector::stream::import_events;
use gotestview::core::config::Config;
use gotestview::core::errors::GtvError;
use gotestview::ingest::{IngestUpdate, InputSource, PrimaryIngest, start_primary};
use gotestview::logger::activity::{
    ActivityEvent, ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger,
};
use gotestview::model::status::StatusTone;
use gotestview::model::tree::TreeRow;
use gotestview::session::history::{History, HistoryState, Results};
use gotestview::session::manager::HistoryManager;

/// Live viewer for `go test -json` streams.
#[derive(Debug, Parser)]
#[command(
    name = "gtv",
    author,
    version,
    about = "Live viewer for go test -json output",
    long_about = "Reads `go test -json` events from stdin (or an exported file) and shows \
                  them as a live tree with per-test logs, search, reruns and export.\n\n\
                  Example: go test -json ./... | gtv"
)]
pub struct Cli {
    /// Load events from an exported file instead of stdin.
    #[arg(short, long, value_name = "FILE")]
    import: Option<PathBuf>,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Ingest the whole stream, print a summary and exit.
    #[arg(long)]
    no_tui: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Print shell completions and exit.
    #[arg(long, value_name = "SHELL")]
    completions: Option<CompletionShell>,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// The stream ended with failing tests.
    #[error("{0}")]
    TestsFailed(String),
    /// Failure reported by the library.
    #[error(transparent)]
    Core(#[from] GtvError),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TestsFailed(_) => 1,
            Self::Runtime(_) => 2,
            Self::Core(err) => {
                if err.is_fatal() {
                    2
                } else {
                    3
                }
            }
        }
    }
}

pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        control::set_override(false);
    }

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        let binary_name = command.get_name().to_string();
        generate(shell, &mut command, binary_name, &mut io::stdout());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let (logger, logger_thread) =
        spawn_logger(ActivityLoggerConfig::at(&config.paths.activity_log))?;

    let result = run_session(cli, &config, &logger);

    if let Err(err) = &result {
        logger.send(ActivityEvent::Error {
            code: error_code(err).to_string(),
            message: err.to_string(),
        });
    }
    logger.shutdown();
    let _ = logger_thread.join();
    if logger.dropped_events() > 0 {
        eprintln!(
            "[GTV-LOG] {} activity log entries dropped",
            logger.dropped_events()
        );
    }
    result
}

fn error_code(err: &CliError) -> &'static str {
    match err {
        CliError::Core(core) => core.code(),
        CliError::TestsFailed(_) => "GTV-TESTS",
        CliError::Runtime(_) => "GTV-CLI",
    }
}

fn run_session(cli: &Cli, config: &Config, logger: &ActivityLoggerHandle) -> Result<(), CliError> {
    let source = match &cli.import {
        Some(path) => {
            let imported = import_events(path)?;
            logger.send(ActivityEvent::ImportLoaded {
                path: imported.path.clone(),
                events: imported.events.len() as u64,
                skipped: imported.skipped,
            });
            if imported.skipped > 0 {
                eprintln!(
                    "[GTV-IMPORT] skipped {} invalid line(s) in {}",
                    imported.skipped,
                    path.display()
                );
            }
            InputSource::Events {
                label: path.display().to_string(),
                events: imported.events,
            }
        }
        None => InputSource::Stdin,
    };

    // Workers block on a full queue until the render loop or the headless
    // drain catches up.
    let (updates_tx, updates_rx) = bounded(config.ingest.channel_capacity);
    let mut manager = HistoryManager::new();
    let primary = start_primary(
        &mut manager,
        source,
        config.ingest.channel_capacity,
        &updates_tx,
        logger,
    )?;

    if cli.no_tui || !cfg!(feature = "tui") || !io::stdout().is_terminal() {
        drop(updates_tx);
        return run_headless(primary, &updates_rx);
    }

    #[cfg(feature = "tui")]
    {
        run_interactive(manager, updates_tx, &updates_rx, config, logger)
    }
    #[cfg(not(feature = "tui"))]
    {
        let _ = manager;
        Ok(())
    }
}

#[cfg(feature = "tui")]
fn run_interactive(
    manager: HistoryManager,
    updates_tx: crossbeam_channel::Sender<IngestUpdate>,
    updates_rx: &Receiver<IngestUpdate>,
    config: &Config,
    logger: &ActivityLoggerHandle,
) -> Result<(), CliError> {
    use std::sync::Arc;

    use gotestview::collector::runner::GoTestExecutor;
    use gotestview::ingest::RerunLauncher;
    use gotestview::tui::{CommandExecutor, ViewerRuntimeConfig, run_viewer};

    let launcher = RerunLauncher::new(
        Arc::new(GoTestExecutor::new(&config.rerun, logger.clone())),
        config.ingest.rerun_channel_capacity,
        updates_tx,
        logger.clone(),
    );
    let executor = CommandExecutor::new(launcher, config.export.clone(), logger.clone());
    // The primary reader may still block on stdin when the user quits; it
    // is not joined.
    run_viewer(
        manager,
        updates_rx,
        &executor,
        &ViewerRuntimeConfig::new(&config.ui, &config.export),
    )?;
    Ok(())
}

// ──────────────────── headless summary ────────────────────

fn run_headless(primary: PrimaryIngest, updates: &Receiver<IngestUpdate>) -> Result<(), CliError> {
    let PrimaryIngest {
        history,
        reader,
        worker,
    } = primary;

    // Drain while the threads run; the iterator ends once both have
    // dropped their senders.
    for update in updates {
        if let IngestUpdate::NoInput { message } = update {
            eprintln!("{message}");
        }
    }
    let read = reader
        .join()
        .map_err(|_| CliError::Runtime("source reader panicked".to_string()))?;
    let state = worker
        .join()
        .map_err(|_| CliError::Runtime("ingest worker panicked".to_string()))?;

    let stats = read?;
    if stats.skipped > 0 {
        eprintln!("[GTV-DECODE] skipped {} malformed line(s)", stats.skipped);
    }

    print!("{}", summary_text(&history));
    let results = history.results();
    if state == HistoryState::Failed {
        return Err(CliError::TestsFailed(format!(
            "{} test(s) failed",
            results.failed.max(1)
        )));
    }
    Ok(())
}

/// Tree dump plus tally, colored when colors are enabled.
fn summary_text(history: &History) -> String {
    let mut out = String::new();
    for row in history.rows(&Default::default()) {
        let line = format!("{}{}", "  ".repeat(row.depth), row.text("…"));
        out.push_str(&paint_row(&row, line).to_string());
        out.push('\n');
    }
    out.push_str(&tally_line(history.results()));
    out.push('\n');
    out
}

fn paint_row(row: &TreeRow, line: String) -> ColoredString {
    match row.tone() {
        Some(StatusTone::Success) => line.green(),
        Some(StatusTone::Failure) => line.red(),
        Some(StatusTone::InProgress) => line.yellow(),
        Some(StatusTone::Skipped) => line.dimmed(),
        Some(StatusTone::Pending) | None => line.normal(),
    }
}

fn tally_line(results: Results) -> String {
    let mut line = format!(
        "{} passed, {} failed, {} skipped",
        results.passed.to_string().green(),
        results.failed.to_string().red(),
        results.skipped.to_string().dimmed()
    );
    if results.running > 0 {
        line.push_str(&format!(", {} unfinished", results.running.to_string().yellow()));
    }
    line
}
