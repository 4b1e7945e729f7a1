//! Property-based tests for viewer reducer invariants.
//!
//! Arbitrary interleavings of keys, ticks, resizes, ingested events and new
//! histories must keep the cursor, log scroll and history selection in range,
//! and every frame must fill the terminal exactly.

use crossterm::event::KeyCode;
use proptest::prelude::*;

use super::model::{ViewerCmd, ViewerMsg};
use super::test_harness::ViewerHarness;
use crate::model::event::{Action, TestEvent};
use crate::session::rerun::RerunTarget;

// ──────────────────── strategies ────────────────────

#[derive(Debug, Clone)]
enum Step {
    Key(KeyCode),
    Tick,
    Resize(u16, u16),
    Feed(TestEvent),
    Finish,
    AddHistory,
}

fn arb_key_code() -> impl Strategy<Value = KeyCode> {
    prop_oneof![
        Just(KeyCode::Char('j')),
        Just(KeyCode::Char('k')),
        Just(KeyCode::Char('g')),
        Just(KeyCode::Char('G')),
        Just(KeyCode::Char('n')),
        Just(KeyCode::Char('N')),
        Just(KeyCode::Char('r')),
        Just(KeyCode::Char('e')),
        Just(KeyCode::Char('/')),
        Just(KeyCode::Char('x')),
        Just(KeyCode::Char('q')),
        Just(KeyCode::Char(' ')),
        Just(KeyCode::Tab),
        Just(KeyCode::Enter),
        Just(KeyCode::Esc),
        Just(KeyCode::Backspace),
        Just(KeyCode::Up),
        Just(KeyCode::Down),
        Just(KeyCode::Home),
        Just(KeyCode::End),
    ]
}

fn arb_event() -> impl Strategy<Value = TestEvent> {
    let package = prop_oneof![Just("pkg/a"), Just("pkg/b")];
    let test = prop_oneof![
        Just(""),
        Just("TestA"),
        Just("TestA/sub"),
        Just("TestA/sub/x"),
        Just("TestB"),
    ];
    let action = prop_oneof![
        Just(Action::Run),
        Just(Action::Output),
        Just(Action::Output),
        Just(Action::Pass),
        Just(Action::Fail),
        Just(Action::Skip),
    ];
    (package, test, action, 0u8..4).prop_map(|(package, test, action, lines)| {
        let event = TestEvent::new(action.clone(), package, test);
        if action == Action::Output {
            event.with_output("x line\n".repeat(usize::from(lines) + 1))
        } else {
            event
        }
    })
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => arb_key_code().prop_map(Step::Key),
        1 => Just(Step::Tick),
        1 => (10u16..140, 3u16..50).prop_map(|(c, r)| Step::Resize(c, r)),
        6 => arb_event().prop_map(Step::Feed),
        1 => Just(Step::Finish),
        1 => Just(Step::AddHistory),
    ]
}

fn apply(harness: &mut ViewerHarness, step: Step) -> ViewerCmd {
    match step {
        Step::Key(code) => harness.inject_keycode(code).last_cmd.clone(),
        Step::Tick => harness.tick().last_cmd.clone(),
        Step::Resize(cols, rows) => harness
            .inject_msg(ViewerMsg::Resize { cols, rows })
            .last_cmd
            .clone(),
        Step::Feed(event) => harness.feed(event).last_cmd.clone(),
        Step::Finish => harness.finish().last_cmd.clone(),
        Step::AddHistory => {
            let history = {
                let manager = &mut harness.model_mut().manager;
                let history = manager.add_history("Rerun: TestA");
                history.start();
                history.id()
            };
            harness
                .inject_msg(ViewerMsg::HistoryAdded { history })
                .last_cmd
                .clone()
        }
    }
}

fn assert_invariants(harness: &ViewerHarness) -> Result<(), TestCaseError> {
    let model = harness.model();
    if model.rows.is_empty() {
        prop_assert_eq!(model.cursor, 0);
    } else {
        prop_assert!(model.cursor < model.rows.len());
    }
    prop_assert!(model.log.scroll <= model.log.line_count);
    prop_assert!(model.manager.current_index() < model.manager.len());

    let frame = &harness.last_frame().text;
    prop_assert_eq!(
        frame.split('\n').count(),
        usize::from(model.terminal_size.1),
        "frame height differs from terminal rows"
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn reducer_preserves_invariants(
        steps in prop::collection::vec(arb_step(), 1..80)
    ) {
        let mut harness = ViewerHarness::default();
        for step in steps {
            apply(&mut harness, step);
            assert_invariants(&harness)?;
        }
    }

    #[test]
    fn rerun_commands_always_address_a_node(
        steps in prop::collection::vec(arb_step(), 1..60)
    ) {
        let mut harness = ViewerHarness::default();
        for step in steps {
            let before = harness
                .model()
                .selected_row()
                .and_then(|row| RerunTarget::from_ref(&row.reference));
            if let ViewerCmd::Rerun(target) = apply(&mut harness, step) {
                prop_assert_eq!(Some(target), before);
            }
        }
    }

    #[test]
    fn quit_only_comes_from_q(
        steps in prop::collection::vec(arb_step(), 1..60)
    ) {
        let mut harness = ViewerHarness::default();
        for step in steps {
            let is_q = matches!(step, Step::Key(KeyCode::Char('q')));
            let search_open = harness.model().search_input.is_some();
            let cmd = apply(&mut harness, step);
            if cmd == ViewerCmd::Quit {
                prop_assert!(is_q && !search_open);
            }
        }
    }

    #[test]
    fn resize_preserves_dimensions(cols in 1u16..300, rows in 1u16..120) {
        let mut harness = ViewerHarness::default();
        harness.inject_msg(ViewerMsg::Resize { cols, rows });
        prop_assert_eq!(harness.model().terminal_size, (cols, rows));
        prop_assert_eq!(harness.last_frame().text.split('\n').count(), usize::from(rows));
    }

    #[test]
    fn tick_only_advances_spinner(ticks in 1usize..40) {
        let mut harness = ViewerHarness::default();
        harness.feed(TestEvent::new(Action::Run, "pkg/a", "TestA"));
        let rows = harness.model().rows.clone();
        for _ in 0..ticks {
            prop_assert_eq!(harness.tick().last_cmd.clone(), ViewerCmd::None);
        }
        prop_assert_eq!(harness.model().tick, ticks);
        prop_assert_eq!(&harness.model().rows, &rows);
    }
}
