//! Headless viewer harness for automated keyflow tests.
//!
//! Drives the model/update/render pipeline without a terminal, capturing a
//! frame snapshot after every step. Ingestion is simulated by recording
//! events straight into the current History and delivering the matching
//! [`IngestUpdate`], exactly as a worker thread would.
//!
//! ```rust,ignore
//! let mut h = ViewerHarness::default();
//! h.feed(TestEvent::new(Action::Run, "pkg/A", "TestA"));
//! h.inject_char('j');
//! h.last_frame().assert_contains("TestA");
//! ```

#![allow(dead_code)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::model::{Focus, ViewerCmd, ViewerModel, ViewerMsg};
use super::render::render;
use super::update::update;
use crate::ingest::IngestUpdate;
use crate::model::event::TestEvent;
use crate::session::manager::HistoryManager;

// ──────────────────── frame snapshot ────────────────────

#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub text: String,
    pub focus: Focus,
    pub cursor: usize,
    pub history: usize,
    /// The command returned by the last update call.
    pub last_cmd: ViewerCmd,
}

impl FrameSnapshot {
    #[track_caller]
    pub fn assert_contains(&self, needle: &str) {
        assert!(
            self.text.contains(needle),
            "frame does not contain {:?}.\nFrame:\n{}",
            needle,
            self.text,
        );
    }

    #[track_caller]
    pub fn assert_not_contains(&self, needle: &str) {
        assert!(
            !self.text.contains(needle),
            "frame unexpectedly contains {:?}.\nFrame:\n{}",
            needle,
            self.text,
        );
    }
}

// ──────────────────── harness ────────────────────

pub struct ViewerHarness {
    model: ViewerModel,
    frames: Vec<FrameSnapshot>,
}

impl Default for ViewerHarness {
    fn default() -> Self {
        Self::new((100, 30))
    }
}

impl ViewerHarness {
    /// Harness with one running "Initial" History.
    pub fn new(terminal_size: (u16, u16)) -> Self {
        let mut manager = HistoryManager::new();
        manager.add_history("Initial").start();
        Self {
            model: ViewerModel::new(manager, terminal_size),
            frames: Vec::new(),
        }
    }

    // ── input ──

    pub fn inject_char(&mut self, c: char) -> &FrameSnapshot {
        self.inject_keycode(KeyCode::Char(c))
    }

    pub fn inject_keycode(&mut self, code: KeyCode) -> &FrameSnapshot {
        self.inject_msg(ViewerMsg::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    pub fn type_text(&mut self, text: &str) -> &FrameSnapshot {
        for c in text.chars() {
            self.inject_char(c);
        }
        self.last_frame()
    }

    pub fn tick(&mut self) -> &FrameSnapshot {
        self.inject_msg(ViewerMsg::Tick)
    }

    pub fn inject_msg(&mut self, msg: ViewerMsg) -> &FrameSnapshot {
        let cmd = update(&mut self.model, msg);
        self.capture(cmd)
    }

    // ── simulated ingestion ──

    /// Record `event` into the current History and deliver the update.
    pub fn feed(&mut self, event: TestEvent) -> &FrameSnapshot {
        let Some(history) = self.model.current_history().cloned() else {
            return self.capture(ViewerCmd::None);
        };
        let outcome = history.record(event);
        self.inject_msg(ViewerMsg::Ingest(IngestUpdate::Recorded {
            history: history.id(),
            outcome,
        }))
    }

    pub fn feed_all(&mut self, events: impl IntoIterator<Item = TestEvent>) -> &FrameSnapshot {
        for event in events {
            self.feed(event);
        }
        self.last_frame()
    }

    /// Close the current History's stream.
    pub fn finish(&mut self) -> &FrameSnapshot {
        let Some(history) = self.model.current_history().cloned() else {
            return self.capture(ViewerCmd::None);
        };
        let state = history.finalize();
        self.inject_msg(ViewerMsg::Ingest(IngestUpdate::Finished {
            history: history.id(),
            state,
        }))
    }

    // ── state ──

    pub fn model(&self) -> &ViewerModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ViewerModel {
        &mut self.model
    }

    pub fn last_frame(&self) -> &FrameSnapshot {
        self.frames
            .last()
            .expect("harness has not captured a frame yet")
    }

    pub fn frames(&self) -> &[FrameSnapshot] {
        &self.frames
    }

    fn capture(&mut self, last_cmd: ViewerCmd) -> &FrameSnapshot {
        self.model.sync();
        let text = render(&self.model).to_lines().join("\n");
        self.frames.push(FrameSnapshot {
            text,
            focus: self.model.focus,
            cursor: self.model.cursor,
            history: self.model.manager.current_index(),
            last_cmd,
        });
        self.last_frame()
    }
}
