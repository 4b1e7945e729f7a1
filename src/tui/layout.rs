//! Pane placement for the viewer.
//!
//! ```text
//! ┌History──┐┌Log───────────────┐
//! └─────────┘│                  │
//! ┌Tests────┐│                  │
//! │         ││                  │
//! └─────────┘└──────────────────┘
//!  footer
//! ```
//!
//! The left column takes a third of the width; the history pane takes a
//! quarter of its height. The search input, when open, steals the last
//! inner row of the log pane.

#![allow(missing_docs)]

/// Below this the viewer shows a "terminal too small" message instead.
pub const MIN_USABLE_COLS: u16 = 30;
pub const MIN_USABLE_ROWS: u16 = 8;

#[must_use]
pub const fn is_terminal_too_small(cols: u16, rows: u16) -> bool {
    cols < MIN_USABLE_COLS || rows < MIN_USABLE_ROWS
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaneRect {
    pub col: u16,
    pub row: u16,
    pub width: u16,
    pub height: u16,
}

impl PaneRect {
    #[must_use]
    pub const fn new(col: u16, row: u16, width: u16, height: u16) -> Self {
        Self {
            col,
            row,
            width,
            height,
        }
    }

    /// Area inside a one-cell border.
    #[must_use]
    pub const fn inner(self) -> Self {
        Self {
            col: self.col + 1,
            row: self.row + 1,
            width: self.width.saturating_sub(2),
            height: self.height.saturating_sub(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerLayout {
    pub history: PaneRect,
    pub tree: PaneRect,
    pub log: PaneRect,
    pub footer: PaneRect,
}

impl ViewerLayout {
    /// Rows of log text visible at once.
    #[must_use]
    pub const fn log_lines(&self, search_open: bool) -> usize {
        let inner = self.log.inner().height;
        let rows = if search_open {
            inner.saturating_sub(1)
        } else {
            inner
        };
        rows as usize
    }

    #[must_use]
    pub const fn tree_lines(&self) -> usize {
        self.tree.inner().height as usize
    }
}

#[must_use]
pub fn build_viewer_layout(cols: u16, rows: u16) -> ViewerLayout {
    let body = rows.saturating_sub(1);
    let left = (cols / 3).max(MIN_USABLE_COLS.min(cols) / 2);
    let history_height = (body / 4).max(3).min(body);

    ViewerLayout {
        history: PaneRect::new(0, 0, left, history_height),
        tree: PaneRect::new(0, history_height, left, body - history_height),
        log: PaneRect::new(left, 0, cols - left, body),
        footer: PaneRect::new(0, body, cols, rows - body),
    }
}
