//! Pure update function for the viewer.
//!
//! `update()` mutates the model and returns a command describing any side
//! effect the runtime should execute. This module performs no I/O.

use crate::ingest::IngestUpdate;
use crate::model::tree::NodeRef;
use crate::session::history::RecordOutcome;
use crate::session::rerun::RerunTarget;

use super::input::{InputAction, InputContext, resolve_key_event};
use super::model::{Focus, NOTHING_TO_EXPORT, ViewerCmd, ViewerModel, ViewerMsg};

/// Apply a message to the model and return the next command for the runtime.
pub fn update(model: &mut ViewerModel, msg: ViewerMsg) -> ViewerCmd {
    match msg {
        ViewerMsg::Tick => {
            model.tick = model.tick.wrapping_add(1);
            ViewerCmd::None
        }

        ViewerMsg::Key(key) => {
            let context = InputContext {
                focus: model.focus,
                search_open: model.search_input.is_some(),
            };
            let resolution = resolve_key_event(&key, context);
            if resolution.consumed {
                model.flash = None;
            }
            match resolution.action {
                Some(action) => apply_input_action(model, action),
                // Unbound keys and releases leave the model untouched.
                None => ViewerCmd::None,
            }
        }

        ViewerMsg::Resize { cols, rows } => {
            model.terminal_size = (cols, rows);
            model.scroll_log_by(0);
            ViewerCmd::None
        }

        ViewerMsg::Ingest(ingest) => apply_ingest(model, ingest),

        ViewerMsg::HistoryAdded { history } => {
            model.switch_history(history);
            model.focus = Focus::Tree;
            ViewerCmd::None
        }

        ViewerMsg::Flash(message) => {
            model.flash = Some(message);
            ViewerCmd::None
        }
    }
}

fn apply_ingest(model: &mut ViewerModel, ingest: IngestUpdate) -> ViewerCmd {
    let current = model.current_history().map(|h| h.id());
    match ingest {
        IngestUpdate::Recorded { history, outcome } => {
            if current == Some(history) {
                model.mark_rows_dirty();
                if touches_log(&model.log.reference, &outcome) {
                    model.mark_log_dirty();
                }
            }
            ViewerCmd::None
        }
        IngestUpdate::Finished { history, .. } => {
            if current == Some(history) {
                model.mark_rows_dirty();
            }
            ViewerCmd::None
        }
        IngestUpdate::NoInput { message } | IngestUpdate::RerunFailed { message, .. } => {
            model.flash = Some(message);
            ViewerCmd::None
        }
        IngestUpdate::SourceClosed { .. } => ViewerCmd::None,
        IngestUpdate::SourceFailed { message } => {
            model.fatal = Some(message);
            ViewerCmd::Quit
        }
    }
}

fn touches_log(shown: &NodeRef, outcome: &RecordOutcome) -> bool {
    match (shown, outcome) {
        (NodeRef::Test(shown), RecordOutcome::Test { key, .. }) => shown == key,
        (NodeRef::Package(shown), RecordOutcome::Package { package, .. }) => shown == package,
        _ => false,
    }
}

fn apply_input_action(model: &mut ViewerModel, action: InputAction) -> ViewerCmd {
    match action {
        InputAction::Quit => ViewerCmd::Quit,
        InputAction::CycleFocus => {
            model.focus = model.focus.next();
            ViewerCmd::None
        }
        InputAction::MoveUp => {
            move_selection(model, -1);
            ViewerCmd::None
        }
        InputAction::MoveDown => {
            move_selection(model, 1);
            ViewerCmd::None
        }
        InputAction::Activate => {
            model.focus = match model.focus {
                Focus::History | Focus::Log => Focus::Tree,
                Focus::Tree => Focus::Log,
            };
            ViewerCmd::None
        }
        InputAction::ToggleExpand => {
            model.toggle_selected();
            ViewerCmd::None
        }
        InputAction::LogTop => {
            model.scroll_log_to_top();
            ViewerCmd::None
        }
        InputAction::LogBottom => {
            model.scroll_log_to_bottom();
            ViewerCmd::None
        }
        InputAction::Rerun => {
            let target = model
                .selected_row()
                .and_then(|row| RerunTarget::from_ref(&row.reference));
            match target {
                Some(target) => ViewerCmd::Rerun(target),
                None => {
                    model.flash = Some("Select a package or test to rerun".to_string());
                    ViewerCmd::None
                }
            }
        }
        InputAction::Export => match model.current_history() {
            Some(history) if history.event_count() > 0 => ViewerCmd::Export {
                history: history.id(),
            },
            _ => {
                model.flash = Some(NOTHING_TO_EXPORT.to_string());
                ViewerCmd::None
            }
        },
        InputAction::OpenSearch => {
            model.search_input = Some(String::new());
            model.scroll_log_by(0);
            ViewerCmd::None
        }
        InputAction::NextMatch => {
            if model.search.next().is_some() {
                model.scroll_to_current_match();
            }
            ViewerCmd::None
        }
        InputAction::PrevMatch => {
            if model.search.prev().is_some() {
                model.scroll_to_current_match();
            }
            ViewerCmd::None
        }
        InputAction::Back => {
            if model.search.is_active() || model.search_missed {
                model.reset_search();
            } else {
                model.focus = Focus::Tree;
            }
            ViewerCmd::None
        }
        InputAction::SearchInput(c) => {
            if let Some(input) = model.search_input.as_mut() {
                input.push(c);
            }
            ViewerCmd::None
        }
        InputAction::SearchBackspace => {
            if let Some(input) = model.search_input.as_mut() {
                input.pop();
            }
            ViewerCmd::None
        }
        InputAction::SearchSubmit => {
            let query = model.search_input.take().unwrap_or_default();
            model.submit_search(query);
            ViewerCmd::None
        }
        InputAction::SearchCancel => {
            model.search_input = None;
            model.scroll_log_by(0);
            ViewerCmd::None
        }
    }
}

fn move_selection(model: &mut ViewerModel, delta: isize) {
    match model.focus {
        Focus::History => {
            let target = model.manager.current_index().checked_add_signed(delta);
            if let Some(index) = target
                && index < model.manager.len()
            {
                model.switch_history(index);
            }
        }
        Focus::Tree => {
            if let Some(index) = model.cursor.checked_add_signed(delta) {
                model.select_row(index);
            }
        }
        Focus::Log => model.scroll_log_by(delta),
    }
}
