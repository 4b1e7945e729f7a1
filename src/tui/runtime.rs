//! Viewer event loop: terminal input, ingest updates and animation ticks in,
//! frames out.

#![allow(missing_docs)]

use std::io::{self, BufWriter};
use std::time::Duration;

use chrono::Local;
use crossbeam_channel::{Receiver, tick};
use crossterm::event::{self, Event};

use crate::collector::stream::{export_events, export_file_name};
use crate::core::config::{ExportConfig, UiConfig};
use crate::core::errors::{GtvError, Result};
use crate::core::paths::export_path;
use crate::ingest::{IngestUpdate, RerunLauncher};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::session::manager::HistoryManager;
use crate::session::rerun::RerunTarget;

use super::model::{NOTHING_TO_EXPORT, ViewerCmd, ViewerModel, ViewerMsg};
use super::render::{paint, render};
use super::terminal_guard::TerminalGuard;
use super::theme::Theme;
use super::update::update;

#[derive(Debug, Clone)]
pub struct ViewerRuntimeConfig {
    pub tick_interval: Duration,
    pub poll_interval: Duration,
    pub export: ExportConfig,
}

impl ViewerRuntimeConfig {
    #[must_use]
    pub fn new(ui: &UiConfig, export: &ExportConfig) -> Self {
        Self {
            tick_interval: ui.tick_interval(),
            poll_interval: ui.poll_interval(),
            export: export.clone(),
        }
    }
}

/// Executes [`ViewerCmd`] side effects on behalf of the loop.
#[derive(Debug)]
pub struct CommandExecutor {
    launcher: RerunLauncher,
    export: ExportConfig,
    logger: ActivityLoggerHandle,
}

impl CommandExecutor {
    #[must_use]
    pub fn new(launcher: RerunLauncher, export: ExportConfig, logger: ActivityLoggerHandle) -> Self {
        Self {
            launcher,
            export,
            logger,
        }
    }

    /// Run `msg` through `update` and execute the resulting commands.
    /// Returns `true` when the viewer should quit.
    pub fn dispatch(&self, model: &mut ViewerModel, msg: ViewerMsg) -> bool {
        let cmd = update(model, msg);
        self.execute(model, cmd)
    }

    fn execute(&self, model: &mut ViewerModel, cmd: ViewerCmd) -> bool {
        match cmd {
            ViewerCmd::None => false,
            ViewerCmd::Quit => true,
            ViewerCmd::Rerun(target) => {
                let follow_up = self.rerun(&mut model.manager, target);
                self.dispatch(model, follow_up)
            }
            ViewerCmd::Export { history } => {
                let follow_up = self.export(&model.manager, history);
                self.dispatch(model, follow_up)
            }
        }
    }

    fn rerun(&self, manager: &mut HistoryManager, target: RerunTarget) -> ViewerMsg {
        match self.launcher.launch(manager, target) {
            // Worker threads run detached; they end with their executor.
            Ok(handles) => ViewerMsg::HistoryAdded {
                history: handles.history.id(),
            },
            Err(err) => {
                self.logger.send(ActivityEvent::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                ViewerMsg::Flash(format!("Rerun failed: {err}"))
            }
        }
    }

    fn export(&self, manager: &HistoryManager, history: usize) -> ViewerMsg {
        let Some(history) = manager.get(history) else {
            return ViewerMsg::Flash("Export failed: no such history".to_string());
        };
        let events = history.all_events();
        if events.is_empty() {
            return ViewerMsg::Flash(NOTHING_TO_EXPORT.to_string());
        }
        let file_name = export_file_name(&Local::now(), &self.export.file_prefix);
        let path = export_path(&self.export.directory, &file_name);
        match export_events(&path, &events) {
            Ok(()) => {
                self.logger.send(ActivityEvent::ExportWritten {
                    history: history.name().to_string(),
                    path: path.clone(),
                    events: events.len() as u64,
                });
                ViewerMsg::Flash(format!(
                    "Exported to {} ({} events)",
                    path.display(),
                    events.len()
                ))
            }
            Err(err) => {
                self.logger.send(ActivityEvent::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                ViewerMsg::Flash(format!("Export failed: {err}"))
            }
        }
    }
}

/// Run the interactive viewer until the user quits.
///
/// # Errors
/// Terminal I/O failures, or the primary source failing mid-stream.
pub fn run_viewer(
    manager: HistoryManager,
    updates: &Receiver<IngestUpdate>,
    executor: &CommandExecutor,
    config: &ViewerRuntimeConfig,
) -> Result<()> {
    let guard = TerminalGuard::new().map_err(|e| GtvError::Runtime {
        details: format!("failed to initialize terminal: {e}"),
    })?;
    let theme = Theme::from_environment();
    let mut model = ViewerModel::new(manager, TerminalGuard::terminal_size());
    let ticker = tick(config.tick_interval);
    let mut out = BufWriter::new(io::stdout());
    let mut dirty = true;

    loop {
        if dirty {
            model.sync();
            paint(&render(&model), &theme, &mut out).map_err(terminal_error)?;
            dirty = false;
        }

        let mut quit = false;
        if event::poll(config.poll_interval).map_err(terminal_error)? {
            let msg = match event::read().map_err(terminal_error)? {
                Event::Key(key) => Some(ViewerMsg::Key(key)),
                Event::Resize(cols, rows) => Some(ViewerMsg::Resize { cols, rows }),
                _ => None,
            };
            if let Some(msg) = msg {
                quit |= executor.dispatch(&mut model, msg);
                dirty = true;
            }
        }

        for update in updates.try_iter() {
            quit |= executor.dispatch(&mut model, ViewerMsg::Ingest(update));
            dirty = true;
        }

        // Ticks only matter while something animates; coalesce missed ones.
        if ticker.try_iter().count() > 0 && model.has_running() {
            quit |= executor.dispatch(&mut model, ViewerMsg::Tick);
            dirty = true;
        }

        if quit {
            break;
        }
    }

    drop(guard);
    match model.fatal {
        Some(details) => Err(GtvError::Runtime { details }),
        None => Ok(()),
    }
}

fn terminal_error(err: io::Error) -> GtvError {
    GtvError::Runtime {
        details: format!("terminal I/O failed: {err}"),
    }
}
