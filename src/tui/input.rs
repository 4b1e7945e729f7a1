//! Key routing for the viewer.
//!
//! Precedence: Ctrl-C always quits, then an open search input swallows
//! keys, then focus-specific bindings, then global bindings.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::model::Focus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub focus: Focus,
    pub search_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    CycleFocus,
    MoveUp,
    MoveDown,
    /// Enter: history→tree, tree→log, log→tree.
    Activate,
    ToggleExpand,
    LogTop,
    LogBottom,
    Rerun,
    Export,
    OpenSearch,
    NextMatch,
    PrevMatch,
    /// Esc: clear search or go back to the tree.
    Back,
    SearchInput(char),
    SearchBackspace,
    SearchSubmit,
    SearchCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputResolution {
    pub action: Option<InputAction>,
    pub consumed: bool,
}

impl InputResolution {
    const fn action(action: InputAction) -> Self {
        Self {
            action: Some(action),
            consumed: true,
        }
    }

    const fn consumed_without_action() -> Self {
        Self {
            action: None,
            consumed: true,
        }
    }

    const fn passthrough() -> Self {
        Self {
            action: None,
            consumed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

/// Bindings listed in the footer, in display order.
pub const FOOTER_BINDINGS: [HelpBinding; 8] = [
    HelpBinding {
        keys: "q",
        description: "quit",
    },
    HelpBinding {
        keys: "Tab",
        description: "focus",
    },
    HelpBinding {
        keys: "Space",
        description: "expand",
    },
    HelpBinding {
        keys: "Enter",
        description: "log",
    },
    HelpBinding {
        keys: "r",
        description: "rerun",
    },
    HelpBinding {
        keys: "e",
        description: "export",
    },
    HelpBinding {
        keys: "/",
        description: "search",
    },
    HelpBinding {
        keys: "n/N",
        description: "next/prev",
    },
];

/// `q: quit, Tab: focus, ...`
#[must_use]
pub fn usage_line() -> String {
    FOOTER_BINDINGS
        .iter()
        .map(|b| format!("{}: {}", b.keys, b.description))
        .collect::<Vec<_>>()
        .join(", ")
}

#[must_use]
pub fn resolve_key_event(key: &KeyEvent, context: InputContext) -> InputResolution {
    if key.kind == KeyEventKind::Release {
        return InputResolution::passthrough();
    }
    if is_ctrl_c(key) {
        return InputResolution::action(InputAction::Quit);
    }
    if context.search_open {
        return resolve_search_key(key);
    }
    match resolve_focus_key(key, context.focus) {
        Some(action) => InputResolution::action(action),
        None => resolve_global_key(key),
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

fn resolve_search_key(key: &KeyEvent) -> InputResolution {
    match key.code {
        KeyCode::Enter => InputResolution::action(InputAction::SearchSubmit),
        KeyCode::Esc => InputResolution::action(InputAction::SearchCancel),
        KeyCode::Backspace => InputResolution::action(InputAction::SearchBackspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            InputResolution::action(InputAction::SearchInput(c))
        }
        _ => InputResolution::consumed_without_action(),
    }
}

fn resolve_focus_key(key: &KeyEvent, focus: Focus) -> Option<InputAction> {
    match (focus, key.code) {
        (Focus::Tree, KeyCode::Char(' ')) => Some(InputAction::ToggleExpand),
        (Focus::Tree, KeyCode::Char('r')) => Some(InputAction::Rerun),
        (Focus::Log, KeyCode::Char('g') | KeyCode::Home) => Some(InputAction::LogTop),
        (Focus::Log, KeyCode::Char('G') | KeyCode::End) => Some(InputAction::LogBottom),
        (Focus::Log, KeyCode::Char('/')) => Some(InputAction::OpenSearch),
        (Focus::Log, KeyCode::Char('n')) => Some(InputAction::NextMatch),
        (Focus::Log, KeyCode::Char('N')) => Some(InputAction::PrevMatch),
        _ => None,
    }
}

fn resolve_global_key(key: &KeyEvent) -> InputResolution {
    match key.code {
        KeyCode::Char('q') => InputResolution::action(InputAction::Quit),
        KeyCode::Tab => InputResolution::action(InputAction::CycleFocus),
        KeyCode::Char('k') | KeyCode::Up => InputResolution::action(InputAction::MoveUp),
        KeyCode::Char('j') | KeyCode::Down => InputResolution::action(InputAction::MoveDown),
        KeyCode::Enter => InputResolution::action(InputAction::Activate),
        KeyCode::Char('e') => InputResolution::action(InputAction::Export),
        KeyCode::Esc => InputResolution::action(InputAction::Back),
        _ => InputResolution::passthrough(),
    }
}
