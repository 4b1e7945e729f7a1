//! `go test -json` event schema and its derived predicates.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::core::errors::{GtvError, Result};

/// Lifecycle or log action carried by a [`TestEvent`].
///
/// The six actions the viewer reasons about get their own variants. Anything
/// else the toolchain emits (`pause`, `cont`, `bench`, `build-output`, ...)
/// is preserved verbatim in [`Action::Other`] so it survives export/import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Run,
    Pass,
    Fail,
    Skip,
    Output,
    Start,
    Other(String),
}

impl Action {
    /// Wire name of the action.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Run => "run",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Output => "output",
            Self::Start => "start",
            Self::Other(name) => name,
        }
    }

    /// Terminal actions end a test's execution: exactly pass, fail and skip.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Pass | Self::Fail | Self::Skip)
    }
}

/// A line without `Action` decodes as an empty [`Action::Other`].
impl Default for Action {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        match value.as_str() {
            "run" => Self::Run,
            "pass" => Self::Pass,
            "fail" => Self::Fail,
            "skip" => Self::Skip,
            "output" => Self::Output,
            "start" => Self::Start,
            _ => Self::Other(value),
        }
    }
}

impl From<Action> for String {
    fn from(value: Action) -> Self {
        match value {
            Action::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a `go test -json` stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEvent {
    #[serde(rename = "Time", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<FixedOffset>>,
    #[serde(rename = "Action", default)]
    pub action: Action,
    #[serde(rename = "Package", default)]
    pub package: String,
    #[serde(rename = "Test", default, skip_serializing_if = "String::is_empty")]
    pub test: String,
    #[serde(rename = "Elapsed", default, skip_serializing_if = "is_zero")]
    pub elapsed: f64,
    #[serde(rename = "Output", default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

impl TestEvent {
    /// Build an event without a timestamp. Mostly useful for fixtures.
    #[must_use]
    pub fn new(action: Action, package: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            time: None,
            action,
            package: package.into(),
            test: test.into(),
            elapsed: 0.0,
            output: String::new(),
        }
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: f64) -> Self {
        self.elapsed = elapsed;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// A root event describes the package as a whole rather than one test.
    #[must_use]
    pub fn is_root_event(&self) -> bool {
        self.test.is_empty()
    }
}

/// Decode one raw input line.
///
/// Works on bytes so that non-UTF-8 garbage is reported as a decode failure
/// instead of an I/O error on the reader.
pub fn decode_event(line: &[u8]) -> Result<TestEvent> {
    serde_json::from_slice(line).map_err(|err| GtvError::Decode {
        details: format!("{err} (line: {})", String::from_utf8_lossy(line).trim_end()),
    })
}
