//! Frame rendering for the viewer.
//!
//! Two stages:
//! - `render()` draws the model into a [`Canvas`] of styled cells. It is
//!   pure, so tests assert on `Canvas::to_lines()`.
//! - `paint()` writes a canvas to the terminal with crossterm commands.

#![allow(missing_docs)]

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor};
use unicode_width::UnicodeWidthChar;

use super::input::usage_line;
use super::layout::{PaneRect, is_terminal_too_small};
use super::model::{Focus, ViewerModel};
use super::theme::{SemanticToken, Theme};
use crate::model::tree::NodeKind;
use crate::search::{SpanStyle, highlight};

// ──────────────────── canvas ────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub token: SemanticToken,
    pub bold: bool,
    pub reverse: bool,
}

impl CellStyle {
    #[must_use]
    pub const fn token(token: SemanticToken) -> Self {
        Self {
            token,
            bold: false,
            reverse: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Glyph { ch: char, style: CellStyle },
    /// Right half of a double-width glyph.
    Continuation,
}

impl Default for Cell {
    fn default() -> Self {
        Self::Glyph {
            ch: ' ',
            style: CellStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Canvas {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
        }
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    fn index(&self, col: u16, row: u16) -> usize {
        usize::from(row) * usize::from(self.width) + usize::from(col)
    }

    fn set(&mut self, col: u16, row: u16, cell: Cell) {
        if col < self.width && row < self.height {
            let index = self.index(col, row);
            self.cells[index] = cell;
        }
    }

    /// Write `text` starting at (`col`, `row`), clipped to `max_width`
    /// columns. Returns the columns used.
    pub fn put_str(
        &mut self,
        col: u16,
        row: u16,
        max_width: u16,
        text: &str,
        style: CellStyle,
    ) -> u16 {
        let mut used: u16 = 0;
        for ch in text.chars() {
            let ch = if ch == '\t' { ' ' } else { ch };
            let Some(width) = ch.width() else {
                continue;
            };
            let width = u16::try_from(width).unwrap_or(1);
            if width == 0 {
                continue;
            }
            if used + width > max_width {
                break;
            }
            self.set(col + used, row, Cell::Glyph { ch, style });
            if width == 2 {
                self.set(col + used + 1, row, Cell::Continuation);
            }
            used += width;
        }
        used
    }

    /// Paint `width` cells from (`col`, `row`) with `style`, keeping glyphs.
    pub fn restyle(&mut self, col: u16, row: u16, width: u16, style: CellStyle) {
        for c in col..col.saturating_add(width).min(self.width) {
            if row >= self.height {
                return;
            }
            let index = self.index(c, row);
            if let Cell::Glyph { style: s, .. } = &mut self.cells[index] {
                *s = style;
            }
        }
    }

    fn draw_box(&mut self, rect: PaneRect, title: &str, focused: bool) {
        if rect.width < 2 || rect.height < 2 {
            return;
        }
        let style = if focused {
            CellStyle {
                token: SemanticToken::Accent,
                bold: true,
                reverse: false,
            }
        } else {
            CellStyle::token(SemanticToken::Muted)
        };
        let right = rect.col + rect.width - 1;
        let bottom = rect.row + rect.height - 1;
        for c in rect.col + 1..right {
            self.set(c, rect.row, Cell::Glyph { ch: '─', style });
            self.set(c, bottom, Cell::Glyph { ch: '─', style });
        }
        for r in rect.row + 1..bottom {
            self.set(rect.col, r, Cell::Glyph { ch: '│', style });
            self.set(right, r, Cell::Glyph { ch: '│', style });
        }
        self.set(rect.col, rect.row, Cell::Glyph { ch: '┌', style });
        self.set(right, rect.row, Cell::Glyph { ch: '┐', style });
        self.set(rect.col, bottom, Cell::Glyph { ch: '└', style });
        self.set(right, bottom, Cell::Glyph { ch: '┘', style });
        self.put_str(rect.col + 1, rect.row, rect.width - 2, title, style);
    }

    /// Plain text rows, trailing spaces trimmed.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        (0..self.height)
            .map(|row| {
                let start = self.index(0, row);
                let line: String = self.cells[start..start + usize::from(self.width)]
                    .iter()
                    .filter_map(|cell| match cell {
                        Cell::Glyph { ch, .. } => Some(*ch),
                        Cell::Continuation => None,
                    })
                    .collect();
                line.trim_end().to_string()
            })
            .collect()
    }
}

// ──────────────────── frame ────────────────────

#[must_use]
pub fn render(model: &ViewerModel) -> Canvas {
    let (cols, rows) = model.terminal_size;
    let mut canvas = Canvas::new(cols, rows);
    if is_terminal_too_small(cols, rows) {
        let message = format!("terminal too small ({cols}x{rows})");
        canvas.put_str(0, 0, cols, &message, CellStyle::token(SemanticToken::Warning));
        return canvas;
    }

    let layout = model.layout();
    render_histories(model, layout.history, &mut canvas);
    render_tree(model, layout.tree, &mut canvas);
    render_log(model, layout.log, &mut canvas);
    render_footer(model, layout.footer, &mut canvas);
    canvas
}

fn selection_style(focused: bool) -> CellStyle {
    CellStyle {
        token: SemanticToken::Neutral,
        bold: true,
        reverse: focused,
    }
}

fn render_histories(model: &ViewerModel, rect: PaneRect, canvas: &mut Canvas) {
    canvas.draw_box(rect, "History", model.focus == Focus::History);
    let inner = rect.inner();
    let total = model.manager.len();
    let selected = model.manager.current_index();
    let (start, end) = centered_window(selected, total, usize::from(inner.height));
    let spinner = model.spinner();

    for (line, index) in (start..end).enumerate() {
        let Some(history) = model.manager.get(index) else {
            continue;
        };
        let row = inner.row + u16::try_from(line).unwrap_or(u16::MAX);
        let text = format!("{}{}", history.name(), history.state_suffix(spinner));
        let style = if index == selected {
            selection_style(model.focus == Focus::History)
        } else {
            CellStyle::default()
        };
        canvas.put_str(inner.col, row, inner.width, &text, style);
        if index == selected {
            canvas.restyle(inner.col, row, inner.width, style);
        }
    }
}

fn render_tree(model: &ViewerModel, rect: PaneRect, canvas: &mut Canvas) {
    canvas.draw_box(rect, "Tests", model.focus == Focus::Tree);
    let inner = rect.inner();
    let (start, end) = centered_window(model.cursor, model.rows.len(), usize::from(inner.height));
    let spinner = model.spinner();

    for (line, index) in (start..end).enumerate() {
        let tree_row = &model.rows[index];
        let row = inner.row + u16::try_from(line).unwrap_or(u16::MAX);
        let token = match (tree_row.kind, tree_row.tone()) {
            (_, Some(tone)) => SemanticToken::for_tone(tone),
            (NodeKind::Package, None) => SemanticToken::Accent,
            _ => SemanticToken::Neutral,
        };
        let mut style = CellStyle::token(token);
        if index == model.cursor {
            style.bold = true;
            style.reverse = model.focus == Focus::Tree;
        }
        let text = format!("{}{}", "  ".repeat(tree_row.depth), tree_row.text(spinner));
        canvas.put_str(inner.col, row, inner.width, &text, style);
        if index == model.cursor {
            canvas.restyle(inner.col, row, inner.width, style);
        }
    }
}

/// Log text split into lines of styled fragments.
fn styled_log_lines(model: &ViewerModel) -> Vec<Vec<(String, SpanStyle)>> {
    let query = model.search.query();
    let spans = if model.search.matches().is_empty() {
        vec![(model.log.text.clone(), SpanStyle::Plain)]
    } else {
        highlight(&model.log.text, query, model.search.current())
            .into_iter()
            .map(|span| (span.text, span.style))
            .collect()
    };

    let mut lines = vec![Vec::new()];
    for (text, style) in spans {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            push_fragment(&mut lines, first, style);
        }
        for part in parts {
            lines.push(Vec::new());
            push_fragment(&mut lines, part, style);
        }
    }
    lines
}

fn push_fragment(lines: &mut [Vec<(String, SpanStyle)>], text: &str, style: SpanStyle) {
    let text = text.trim_end_matches('\r');
    if text.is_empty() {
        return;
    }
    if let Some(line) = lines.last_mut() {
        line.push((text.to_string(), style));
    }
}

fn render_log(model: &ViewerModel, rect: PaneRect, canvas: &mut Canvas) {
    canvas.draw_box(rect, &model.log_title(), model.focus == Focus::Log);
    let inner = rect.inner();
    let visible = model.layout().log_lines(model.search_input.is_some());

    for (line, fragments) in styled_log_lines(model)
        .into_iter()
        .skip(model.log.scroll)
        .take(visible)
        .enumerate()
    {
        let row = inner.row + u16::try_from(line).unwrap_or(u16::MAX);
        let mut col = inner.col;
        for (text, span_style) in fragments {
            let style = match span_style {
                SpanStyle::Plain => CellStyle::default(),
                SpanStyle::Match => CellStyle {
                    token: SemanticToken::Warning,
                    bold: false,
                    reverse: true,
                },
                SpanStyle::CurrentMatch => CellStyle {
                    token: SemanticToken::Danger,
                    bold: true,
                    reverse: true,
                },
            };
            let remaining = inner.width.saturating_sub(col - inner.col);
            col += canvas.put_str(col, row, remaining, &text, style);
        }
    }

    if let Some(input) = &model.search_input
        && inner.height > 0
    {
        let row = inner.row + inner.height - 1;
        let style = CellStyle::token(SemanticToken::Accent);
        canvas.put_str(inner.col, row, inner.width, &format!("/{input}"), style);
    }
}

fn render_footer(model: &ViewerModel, rect: PaneRect, canvas: &mut Canvas) {
    if rect.height == 0 {
        return;
    }
    match &model.flash {
        Some(message) => {
            canvas.put_str(
                rect.col,
                rect.row,
                rect.width,
                message,
                CellStyle::token(SemanticToken::Warning),
            );
        }
        None => {
            canvas.put_str(
                rect.col,
                rect.row,
                rect.width,
                &usage_line(),
                CellStyle::token(SemanticToken::Muted),
            );
        }
    }
}

fn centered_window(selected: usize, total: usize, rows: usize) -> (usize, usize) {
    if total == 0 || rows == 0 {
        return (0, 0);
    }
    let rows = rows.min(total);
    let start = selected
        .saturating_sub(rows / 2)
        .min(total.saturating_sub(rows));
    let end = (start + rows).min(total);
    (start, end)
}

// ──────────────────── terminal output ────────────────────

/// Write the whole canvas to `out`.
pub fn paint<W: Write>(canvas: &Canvas, theme: &Theme, out: &mut W) -> io::Result<()> {
    for row in 0..canvas.height() {
        queue!(out, MoveTo(0, row))?;
        let mut current: Option<CellStyle> = None;
        for col in 0..canvas.width() {
            let Cell::Glyph { ch, style } = canvas.cells[canvas.index(col, row)] else {
                continue;
            };
            if current != Some(style) {
                queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
                if let Some(color) = theme.color(style.token) {
                    queue!(out, SetForegroundColor(color))?;
                }
                if style.bold {
                    queue!(out, SetAttribute(Attribute::Bold))?;
                }
                if style.reverse {
                    queue!(out, SetAttribute(Attribute::Reverse))?;
                }
                current = Some(style);
            }
            queue!(out, Print(ch))?;
        }
    }
    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    out.flush()
}
