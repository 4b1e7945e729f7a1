//! Status resolution: maps an ordered event list to what the tree displays.
//!
//! Two questions are answered independently:
//! - *which icon to show*: the most recent action of any kind wins, not the
//!   worst one;
//! - *is the test executing right now*: the most recent terminal-vs-`run`
//!   action decides, ignoring interleaved `output` events.

use crate::model::event::{Action, TestEvent};

/// Braille spinner frames used for running tests and histories.
pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner glyph for an animation tick.
#[must_use]
pub fn spinner_frame(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Display status derived from a test's events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TestStatus {
    /// Started but not yet running, or nothing decisive seen yet.
    #[default]
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

/// Semantic color of a status; the front-end maps tones to concrete colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Failure,
    InProgress,
    Skipped,
    Pending,
}

impl TestStatus {
    /// Icon for this status. `Running` shows the supplied animation frame.
    #[must_use]
    pub fn icon(self, spinner: &str) -> &str {
        match self {
            Self::Pending => "⧗",
            Self::Running => spinner,
            Self::Passed => "✓",
            Self::Failed => "✗",
            Self::Skipped => "⏭",
        }
    }

    #[must_use]
    pub const fn tone(self) -> StatusTone {
        match self {
            Self::Pending => StatusTone::Pending,
            Self::Running => StatusTone::InProgress,
            Self::Passed => StatusTone::Success,
            Self::Failed => StatusTone::Failure,
            Self::Skipped => StatusTone::Skipped,
        }
    }
}

/// Resolve status and elapsed seconds for one test's ordered events.
///
/// Elapsed is the most recent non-zero value. Actions without a status
/// mapping (`output`, `pause`, ...) leave the previous status in place.
#[must_use]
pub fn resolve_test_status(events: &[TestEvent]) -> (TestStatus, f64) {
    let mut status = TestStatus::Pending;
    let mut elapsed = 0.0;
    for event in events {
        if event.elapsed > 0.0 {
            elapsed = event.elapsed;
        }
        match event.action {
            Action::Pass => status = TestStatus::Passed,
            Action::Fail => status = TestStatus::Failed,
            Action::Run => status = TestStatus::Running,
            Action::Skip => status = TestStatus::Skipped,
            Action::Start => status = TestStatus::Pending,
            Action::Output | Action::Other(_) => {}
        }
    }
    (status, elapsed)
}

/// Whether the test is still executing, judged from the end of the list.
#[must_use]
pub fn is_test_running(events: &[TestEvent]) -> bool {
    for event in events.iter().rev() {
        if event.action.is_terminal() {
            return false;
        }
        if event.action == Action::Run {
            return true;
        }
    }
    false
}

/// Render a tree label: `"▼ ✓ TestName [0.012s]"`.
#[must_use]
pub fn format_node_text(expand_icon: &str, status_icon: &str, name: &str, elapsed: f64) -> String {
    if elapsed > 0.0 {
        format!("{expand_icon}{status_icon} {name} [{elapsed:.3}s]")
    } else {
        format!("{expand_icon}{status_icon} {name}")
    }
}

/// Expand/collapse marker for a node; empty for leaves.
#[must_use]
pub const fn expand_icon(has_children: bool, expanded: bool) -> &'static str {
    match (has_children, expanded) {
        (false, _) => "",
        (true, true) => "▼ ",
        (true, false) => "▶ ",
    }
}
