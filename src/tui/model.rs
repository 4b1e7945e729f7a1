//! Elm-style state model for the viewer.
//!
//! All render-owned state lives in [`ViewerModel`]: which history is shown,
//! cursor and collapsed nodes per history, the log snapshot and search
//! state. Input and ingestion arrive as [`ViewerMsg`] values; side effects
//! are returned as [`ViewerCmd`] values for the runtime to execute.
//!
//! The model never holds a History lock beyond the copy it takes.

use std::collections::HashSet;
use std::sync::Arc;

use crossterm::event::KeyEvent;

use crate::ingest::IngestUpdate;
use crate::model::status::spinner_frame;
use crate::model::tree::{NodeId, NodeKind, NodeRef, TreeRow};
use crate::search::SearchState;
use crate::session::history::{History, HistoryState, assemble_log};
use crate::session::manager::HistoryManager;
use crate::session::rerun::RerunTarget;
use crate::tui::layout::{ViewerLayout, build_viewer_layout};

/// Log text shown when the synthetic root is selected.
pub const ROOT_PLACEHOLDER: &str = "select testcase";

/// Flash shown instead of writing an empty export file.
pub const NOTHING_TO_EXPORT: &str = "Nothing to export";

// ──────────────────── focus ────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    History,
    #[default]
    Tree,
    Log,
}

impl Focus {
    /// Tab order: history → tree → log → history.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::History => Self::Tree,
            Self::Tree => Self::Log,
            Self::Log => Self::History,
        }
    }
}

// ──────────────────── messages / commands ────────────────────

#[derive(Debug, Clone)]
pub enum ViewerMsg {
    Key(KeyEvent),
    /// Animation tick.
    Tick,
    Resize {
        cols: u16,
        rows: u16,
    },
    Ingest(IngestUpdate),
    /// The runtime created a new History (rerun); show it.
    HistoryAdded {
        history: usize,
    },
    /// One-line status for the footer.
    Flash(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCmd {
    None,
    Quit,
    Rerun(RerunTarget),
    Export { history: usize },
}

// ──────────────────── per-history view state ────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryView {
    /// Node under the cursor; `None` means the root.
    pub selected: Option<NodeId>,
    pub collapsed: HashSet<NodeId>,
}

/// Snapshot of the selected node's log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPanel {
    pub reference: NodeRef,
    pub text: String,
    pub line_count: usize,
    /// First visible line.
    pub scroll: usize,
}

// ──────────────────── model ────────────────────

#[derive(Debug)]
pub struct ViewerModel {
    pub manager: HistoryManager,
    pub focus: Focus,
    views: Vec<HistoryView>,
    /// Visible rows of the current history's tree.
    pub rows: Vec<TreeRow>,
    pub cursor: usize,
    pub log: LogPanel,
    pub search: SearchState,
    /// Text typed after `/`; `Some` while the search input is open.
    pub search_input: Option<String>,
    /// Set when the last submitted query found nothing.
    pub search_missed: bool,
    pub flash: Option<String>,
    pub tick: usize,
    pub terminal_size: (u16, u16),
    /// Unrecoverable primary-source failure; the runtime exits with it.
    pub fatal: Option<String>,
    rows_dirty: bool,
    log_dirty: bool,
}

impl ViewerModel {
    #[must_use]
    pub fn new(manager: HistoryManager, terminal_size: (u16, u16)) -> Self {
        let mut model = Self {
            manager,
            focus: Focus::default(),
            views: Vec::new(),
            rows: Vec::new(),
            cursor: 0,
            log: LogPanel::default(),
            search: SearchState::default(),
            search_input: None,
            search_missed: false,
            flash: None,
            tick: 0,
            terminal_size,
            fatal: None,
            rows_dirty: true,
            log_dirty: true,
        };
        model.sync();
        model
    }

    #[must_use]
    pub fn current_history(&self) -> Option<&Arc<History>> {
        self.manager.current()
    }

    #[must_use]
    pub fn spinner(&self) -> &'static str {
        spinner_frame(self.tick)
    }

    #[must_use]
    pub fn layout(&self) -> ViewerLayout {
        build_viewer_layout(self.terminal_size.0, self.terminal_size.1)
    }

    #[must_use]
    pub fn selected_row(&self) -> Option<&TreeRow> {
        self.rows.get(self.cursor)
    }

    /// Whether anything still animates.
    #[must_use]
    pub fn has_running(&self) -> bool {
        self.manager
            .iter()
            .any(|h| h.state() == HistoryState::Running)
    }

    /// Title of the log pane, including the search position.
    #[must_use]
    pub fn log_title(&self) -> String {
        if self.search_missed {
            return "Log [no match]".to_string();
        }
        self.search
            .position()
            .map_or_else(|| "Log".to_string(), |pos| format!("Log [{pos}]"))
    }

    pub(crate) fn mark_rows_dirty(&mut self) {
        self.rows_dirty = true;
    }

    pub(crate) fn mark_log_dirty(&mut self) {
        self.log_dirty = true;
    }

    fn view_mut(&mut self, history: usize) -> &mut HistoryView {
        if self.views.len() <= history {
            self.views.resize_with(history + 1, HistoryView::default);
        }
        &mut self.views[history]
    }

    #[must_use]
    pub fn view(&self, history: usize) -> Option<&HistoryView> {
        self.views.get(history)
    }

    /// Bring rows and log up to date with the current history.
    pub fn sync(&mut self) {
        if self.rows_dirty {
            self.rows_dirty = false;
            self.refresh_rows();
        }
        if self.log_dirty {
            self.log_dirty = false;
            self.refresh_log();
        }
    }

    fn refresh_rows(&mut self) {
        let Some(history) = self.manager.current().cloned() else {
            self.rows.clear();
            self.cursor = 0;
            return;
        };
        let view = self.view_mut(history.id()).clone();
        self.rows = history.rows(&view.collapsed);
        let position = view
            .selected
            .and_then(|id| self.rows.iter().position(|row| row.id == id));
        let previous = self.selected_reference();
        self.cursor = position.unwrap_or(0);
        if self.selected_reference() != previous {
            self.log_dirty = true;
        }
    }

    fn selected_reference(&self) -> Option<NodeRef> {
        self.selected_row().map(|row| row.reference.clone())
    }

    fn refresh_log(&mut self) {
        let row = self.selected_row().cloned();
        let (reference, text) = match (&row, self.manager.current()) {
            (Some(row), _) if row.kind == NodeKind::Root => {
                (NodeRef::None, ROOT_PLACEHOLDER.to_string())
            }
            (Some(row), Some(history)) => (
                row.reference.clone(),
                assemble_log(&history.events_for(&row.reference)),
            ),
            _ => (NodeRef::None, String::new()),
        };

        if reference != self.log.reference {
            self.log.scroll = 0;
        }
        self.log.line_count = text.lines().count();
        self.log.reference = reference;
        self.log.text = text;
        if self.search.is_active() {
            self.search.refresh(&self.log.text);
        }
        self.clamp_scroll();
    }

    /// Move the tree cursor to `index` (clamped) and follow it in the log.
    pub fn select_row(&mut self, index: usize) {
        if self.rows.is_empty() {
            return;
        }
        self.cursor = index.min(self.rows.len() - 1);
        let id = self.rows[self.cursor].id;
        if let Some(history) = self.manager.current().map(|h| h.id()) {
            self.view_mut(history).selected = Some(id);
        }
        self.refresh_log();
    }

    /// Toggle the selected node's expansion.
    pub fn toggle_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if !row.has_children {
            return;
        }
        let id = row.id;
        if let Some(history) = self.manager.current().map(|h| h.id()) {
            let collapsed = &mut self.view_mut(history).collapsed;
            if !collapsed.remove(&id) {
                collapsed.insert(id);
            }
            self.view_mut(history).selected = Some(id);
        }
        self.refresh_rows();
    }

    /// Show history `index`, resetting search state.
    pub fn switch_history(&mut self, index: usize) {
        if !self.manager.select(index) {
            return;
        }
        self.reset_search();
        self.log.reference = NodeRef::None;
        self.refresh_rows();
        self.refresh_log();
    }

    pub fn reset_search(&mut self) {
        self.search.clear();
        self.search_input = None;
        self.search_missed = false;
    }

    /// Commit `query` against the current log text.
    pub fn submit_search(&mut self, query: String) {
        if query.is_empty() {
            self.reset_search();
            return;
        }
        self.search.set_query(query, &self.log.text);
        self.search_missed = self.search.matches().is_empty();
        self.scroll_to_current_match();
    }

    pub fn scroll_to_current_match(&mut self) {
        if let Some(line) = self.search.current_line() {
            self.log.scroll = line;
            self.clamp_scroll();
        }
    }

    pub fn scroll_log_by(&mut self, delta: isize) {
        self.log.scroll = self.log.scroll.saturating_add_signed(delta);
        self.clamp_scroll();
    }

    pub fn scroll_log_to_top(&mut self) {
        self.log.scroll = 0;
    }

    pub fn scroll_log_to_bottom(&mut self) {
        self.log.scroll = usize::MAX;
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let visible = self.layout().log_lines(self.search_input.is_some()).max(1);
        let max = self.log.line_count.saturating_sub(visible);
        self.log.scroll = self.log.scroll.min(max);
    }
}
