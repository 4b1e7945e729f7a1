//! Scenario drills: realistic multi-step viewer sessions driven through the
//! headless harness.

use crossterm::event::KeyCode;

use super::model::{Focus, ViewerCmd, ViewerMsg};
use super::test_harness::ViewerHarness;
use crate::model::event::{Action, TestEvent};
use crate::model::tree::TestKey;
use crate::session::history::HistoryState;
use crate::session::rerun::RerunTarget;

fn ev(action: Action, package: &str, test: &str) -> TestEvent {
    TestEvent::new(action, package, test)
}

fn out(package: &str, test: &str, text: &str) -> TestEvent {
    TestEvent::new(Action::Output, package, test).with_output(text)
}

// ──────────────────── live streaming ────────────────────

#[test]
fn drill_stream_builds_tree_while_running() {
    let mut h = ViewerHarness::default();
    h.feed(ev(Action::Start, "example.com/svc", ""));
    h.feed(ev(Action::Run, "example.com/svc", "TestHandler"));
    let frame = h.tick();
    frame.assert_contains("Initial ⠙");
    frame.assert_contains("svc");
    frame.assert_contains("TestHandler");

    h.feed(ev(Action::Run, "example.com/svc", "TestHandler/get_user"));
    h.feed(out("example.com/svc", "TestHandler/get_user", "    ok\n"));
    h.feed(ev(Action::Pass, "example.com/svc", "TestHandler/get_user").with_elapsed(0.01));
    h.feed(ev(Action::Fail, "example.com/svc", "TestHandler").with_elapsed(0.02));
    h.feed(ev(Action::Fail, "example.com/svc", ""));
    let frame = h.finish();
    frame.assert_contains("Initial ✗");
    frame.assert_contains("get_user");
    assert_eq!(
        h.model().current_history().unwrap().state(),
        HistoryState::Failed
    );
}

#[test]
fn drill_log_follows_selected_test_as_output_arrives() {
    let mut h = ViewerHarness::default();
    h.feed_all([
        ev(Action::Start, "pkg/A", ""),
        ev(Action::Run, "pkg/A", "T"),
        out("pkg/A", "T", "log1\n"),
    ]);
    h.inject_char('j');
    let frame = h.inject_char('j');
    assert_eq!(frame.cursor, 2);
    frame.assert_contains("log1");
    frame.assert_not_contains("select testcase");

    let frame = h.feed(out("pkg/A", "T", "log2\n"));
    frame.assert_contains("log2");
}

// ──────────────────── search ────────────────────

#[test]
fn drill_search_counts_and_cycles_matches() {
    let mut h = ViewerHarness::default();
    h.feed_all([
        ev(Action::Run, "pkg/A", "TestRetry"),
        out("pkg/A", "TestRetry", "attempt 1: timeout\n"),
        out("pkg/A", "TestRetry", "attempt 2: TIMEOUT\n"),
        out("pkg/A", "TestRetry", "attempt 3: ok\n"),
    ]);
    h.inject_char('j');
    h.inject_char('j');
    h.inject_keycode(KeyCode::Enter);
    h.inject_char('/');
    h.type_text("timeout");
    let frame = h.inject_keycode(KeyCode::Enter);
    frame.assert_contains("Log [1/2]");
    assert_eq!(frame.focus, Focus::Log);

    h.inject_char('N').assert_contains("Log [2/2]");
    h.inject_char('/');
    h.type_text("nothing-like-this");
    h.inject_keycode(KeyCode::Enter)
        .assert_contains("Log [no match]");
    h.inject_keycode(KeyCode::Esc).assert_not_contains("no match");
}

// ──────────────────── rerun and histories ────────────────────

#[test]
fn drill_rerun_request_then_history_switch() {
    let mut h = ViewerHarness::default();
    h.feed_all([
        ev(Action::Run, "pkg/A", "TestA"),
        ev(Action::Fail, "pkg/A", "TestA"),
    ]);
    h.finish();
    h.inject_char('j');
    h.inject_char('j');
    let frame = h.inject_char('r');
    assert_eq!(
        frame.last_cmd,
        ViewerCmd::Rerun(RerunTarget::Test(TestKey::new("pkg/A", "TestA")))
    );

    // The runtime creates the History and reports it.
    h.model_mut().manager.add_history("Rerun: TestA").start();
    let frame = h.inject_msg(ViewerMsg::HistoryAdded { history: 1 });
    assert_eq!(frame.history, 1);
    frame.assert_contains("Rerun: TestA ⠋");

    h.feed(ev(Action::Run, "pkg/A", "TestA"));
    h.feed(ev(Action::Pass, "pkg/A", "TestA"));
    h.finish().assert_contains("Rerun: TestA ✓");

    // The earlier History is untouched.
    h.inject_keycode(KeyCode::Tab);
    h.inject_keycode(KeyCode::Tab);
    let frame = h.inject_char('k');
    assert_eq!(frame.history, 0);
    assert_eq!(
        h.model().current_history().unwrap().state(),
        HistoryState::Failed
    );
}

#[test]
fn drill_export_request_targets_shown_history() {
    let mut h = ViewerHarness::default();
    h.feed(ev(Action::Run, "pkg/A", "TestA"));
    let frame = h.inject_char('e');
    assert_eq!(frame.last_cmd, ViewerCmd::Export { history: 0 });
    let frame = h.inject_msg(ViewerMsg::Flash("Exported to ./x.json (1 events)".into()));
    frame.assert_contains("Exported to ./x.json (1 events)");
    h.inject_char('j').assert_contains("q: quit");
}

#[test]
fn drill_export_before_any_event() {
    let mut h = ViewerHarness::default();
    let frame = h.inject_char('e');
    assert_eq!(frame.last_cmd, ViewerCmd::None);
    frame.assert_contains("Nothing to export");
}

#[test]
fn drill_resize_to_tiny_and_back() {
    let mut h = ViewerHarness::default();
    h.feed(ev(Action::Run, "pkg/A", "TestA"));
    h.inject_msg(ViewerMsg::Resize { cols: 25, rows: 6 })
        .assert_contains("terminal too small");
    h.inject_msg(ViewerMsg::Resize { cols: 100, rows: 30 })
        .assert_contains("TestA");
}
