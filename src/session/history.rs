//! One test-run session.
//!
//! A [`History`] owns the per-test event lists, the package bookkeeping for
//! root events, an arrival-ordered journal and the result tree. All of it
//! sits behind a single `parking_lot::Mutex` so an event list and its tree
//! node are always updated together; readers only ever get owned copies.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::model::event::{Action, TestEvent};
use crate::model::status::{TestStatus, is_test_running, resolve_test_status};
use crate::model::tree::{NodeId, NodeRef, ResultTree, TestKey, TreeRow};

/// Lifecycle of a History.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl HistoryState {
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Suffix shown after the history name in the history list.
    #[must_use]
    pub fn suffix(self, spinner: &str) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Running => format!(" {spinner}"),
            Self::Completed => " ✓".to_string(),
            Self::Failed => " ✗".to_string(),
        }
    }
}

/// Per-test outcome tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Results {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub running: usize,
}

/// What a recorded event changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A test's event list grew; `node` is its (possibly new) tree node.
    Test { key: TestKey, node: NodeId },
    /// A package root event was recorded; `node` is set once the package is
    /// visible in the tree.
    Package {
        package: String,
        node: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Test(usize),
    Package(usize),
}

#[derive(Debug, Default)]
struct HistoryInner {
    state: HistoryState,
    tests: Vec<(TestKey, Vec<TestEvent>)>,
    test_slots: HashMap<TestKey, usize>,
    packages: Vec<(String, Vec<TestEvent>)>,
    package_slots: HashMap<String, usize>,
    journal: Vec<(Slot, usize)>,
    tree: ResultTree,
}

impl HistoryInner {
    fn record_test(&mut self, key: TestKey, event: TestEvent) -> RecordOutcome {
        let slot = match self.test_slots.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.tests.len();
                self.tests.push((key.clone(), Vec::new()));
                self.test_slots.insert(key.clone(), slot);
                slot
            }
        };
        let events = &mut self.tests[slot].1;
        self.journal.push((Slot::Test(slot), events.len()));
        events.push(event);

        let package_is_new = self.tree.package_node(&key.package).is_none();
        let node = self
            .tree
            .ingest(&key, &self.tests[slot].1)
            .unwrap_or_else(|| self.tree.root());
        if package_is_new
            && let Some(&pkg_slot) = self.package_slots.get(&key.package)
        {
            self.tree
                .update_package(&key.package, &self.packages[pkg_slot].1);
        }
        RecordOutcome::Test { key, node }
    }

    fn record_root(&mut self, event: TestEvent) -> RecordOutcome {
        let package = event.package.clone();
        let slot = match self.package_slots.get(&package) {
            Some(&slot) => slot,
            None => {
                let slot = self.packages.len();
                self.packages.push((package.clone(), Vec::new()));
                self.package_slots.insert(package.clone(), slot);
                slot
            }
        };
        let events = &mut self.packages[slot].1;
        self.journal.push((Slot::Package(slot), events.len()));
        events.push(event);

        let node = self.tree.update_package(&package, &self.packages[slot].1);
        RecordOutcome::Package { package, node }
    }

    fn has_failure(&self) -> bool {
        let fails = |events: &Vec<TestEvent>| events.iter().any(|e| e.action == Action::Fail);
        self.tests.iter().any(|(_, events)| fails(events))
            || self.packages.iter().any(|(_, events)| fails(events))
    }
}

/// One run session: the primary stream or a rerun.
#[derive(Debug)]
pub struct History {
    id: usize,
    name: String,
    inner: Mutex<HistoryInner>,
}

impl History {
    /// Create an Idle history with an empty tree.
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            inner: Mutex::new(HistoryInner::default()),
        }
    }

    /// Position of this history in its manager.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> HistoryState {
        self.inner.lock().state
    }

    /// History-list suffix for the current state.
    #[must_use]
    pub fn state_suffix(&self, spinner: &str) -> String {
        self.state().suffix(spinner)
    }

    /// Idle → Running. Returns `false` if the history was not Idle.
    pub fn start(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == HistoryState::Idle {
            inner.state = HistoryState::Running;
            true
        } else {
            false
        }
    }

    /// Append one event and fold it into the tree, atomically.
    pub fn record(&self, event: TestEvent) -> RecordOutcome {
        let mut inner = self.inner.lock();
        match TestKey::of(&event) {
            Some(key) => inner.record_test(key, event),
            None => inner.record_root(event),
        }
    }

    /// Settle the final state once the event source has closed.
    ///
    /// Failed if any recorded event is a `fail`, Completed otherwise. The
    /// scan runs once; later calls return the settled state unchanged.
    pub fn finalize(&self) -> HistoryState {
        let mut inner = self.inner.lock();
        if !inner.state.is_final() {
            inner.state = if inner.has_failure() {
                HistoryState::Failed
            } else {
                HistoryState::Completed
            };
        }
        inner.state
    }

    /// Copy of the events behind a node reference.
    ///
    /// Test nodes yield that test's events, package nodes the package's
    /// root events, and unreferenced nodes nothing.
    #[must_use]
    pub fn events_for(&self, reference: &NodeRef) -> Vec<TestEvent> {
        let inner = self.inner.lock();
        match reference {
            NodeRef::None => Vec::new(),
            NodeRef::Test(key) => inner
                .test_slots
                .get(key)
                .map(|&slot| inner.tests[slot].1.clone())
                .unwrap_or_default(),
            NodeRef::Package(package) => inner
                .package_slots
                .get(package)
                .map(|&slot| inner.packages[slot].1.clone())
                .unwrap_or_default(),
        }
    }

    /// Every recorded event in arrival order.
    #[must_use]
    pub fn all_events(&self) -> Vec<TestEvent> {
        let inner = self.inner.lock();
        inner
            .journal
            .iter()
            .map(|&(slot, index)| match slot {
                Slot::Test(s) => inner.tests[s].1[index].clone(),
                Slot::Package(s) => inner.packages[s].1[index].clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.inner.lock().journal.len()
    }

    /// Visible tree rows for the render loop.
    #[must_use]
    pub fn rows(&self, collapsed: &HashSet<NodeId>) -> Vec<TreeRow> {
        self.inner.lock().tree.rows(collapsed)
    }

    /// Run `f` against the tree while holding the lock.
    pub fn with_tree<R>(&self, f: impl FnOnce(&ResultTree) -> R) -> R {
        f(&self.inner.lock().tree)
    }

    /// Whether any test in this history is still executing.
    #[must_use]
    pub fn has_running_tests(&self) -> bool {
        self.inner
            .lock()
            .tests
            .iter()
            .any(|(_, events)| is_test_running(events))
    }

    /// Tally resolved per-test statuses.
    #[must_use]
    pub fn results(&self) -> Results {
        let inner = self.inner.lock();
        let mut results = Results::default();
        for (_, events) in &inner.tests {
            match resolve_test_status(events).0 {
                TestStatus::Passed => results.passed += 1,
                TestStatus::Failed => results.failed += 1,
                TestStatus::Skipped => results.skipped += 1,
                TestStatus::Running => results.running += 1,
                TestStatus::Pending => {}
            }
        }
        results
    }
}

/// Concatenate the `output` fields of `events` in order.
#[must_use]
pub fn assemble_log(events: &[TestEvent]) -> String {
    events
        .iter()
        .filter(|e| e.action == Action::Output)
        .map(|e| e.output.as_str())
        .collect()
}
