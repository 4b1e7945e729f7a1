//! Theme tokens and the `NO_COLOR` accessibility hook for the viewer.

#![allow(missing_docs)]

use std::env;

use crossterm::style::Color;

use crate::model::status::StatusTone;

/// Color output mode for compatibility with `NO_COLOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessibilityProfile {
    pub color: ColorMode,
}

impl Default for AccessibilityProfile {
    fn default() -> Self {
        Self {
            color: ColorMode::Enabled,
        }
    }
}

impl AccessibilityProfile {
    #[must_use]
    pub const fn from_no_color_flag(no_color: bool) -> Self {
        Self {
            color: if no_color {
                ColorMode::Disabled
            } else {
                ColorMode::Enabled
            },
        }
    }

    #[must_use]
    pub fn from_environment() -> Self {
        Self::from_no_color_flag(env::var_os("NO_COLOR").is_some())
    }

    #[must_use]
    pub const fn no_color(self) -> bool {
        matches!(self.color, ColorMode::Disabled)
    }
}

/// Semantic token category independent of concrete colors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SemanticToken {
    Accent,
    Success,
    Warning,
    Danger,
    Muted,
    #[default]
    Neutral,
}

impl SemanticToken {
    #[must_use]
    pub const fn for_tone(tone: StatusTone) -> Self {
        match tone {
            StatusTone::Success => Self::Success,
            StatusTone::Failure => Self::Danger,
            StatusTone::InProgress => Self::Warning,
            StatusTone::Skipped => Self::Muted,
            StatusTone::Pending => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub accessibility: AccessibilityProfile,
}

impl Theme {
    #[must_use]
    pub const fn new(accessibility: AccessibilityProfile) -> Self {
        Self { accessibility }
    }

    #[must_use]
    pub fn from_environment() -> Self {
        Self::new(AccessibilityProfile::from_environment())
    }

    /// Foreground color for `token`; `None` means the terminal default.
    #[must_use]
    pub const fn color(&self, token: SemanticToken) -> Option<Color> {
        if self.accessibility.no_color() {
            return None;
        }
        match token {
            SemanticToken::Accent => Some(Color::Cyan),
            SemanticToken::Success => Some(Color::Green),
            SemanticToken::Warning => Some(Color::Yellow),
            SemanticToken::Danger => Some(Color::Red),
            SemanticToken::Muted => Some(Color::DarkGrey),
            SemanticToken::Neutral => None,
        }
    }
}
