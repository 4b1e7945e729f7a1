//! Ordered set of histories plus the current selection.

use std::sync::Arc;

use crate::session::history::History;

/// Owns every History created during a session.
///
/// Histories are only ever appended; ids equal their position. Adding a
/// history makes it current.
#[derive(Debug, Default)]
pub struct HistoryManager {
    histories: Vec<Arc<History>>,
    current: usize,
}

impl HistoryManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new Idle history named `name` and select it.
    pub fn add_history(&mut self, name: impl Into<String>) -> Arc<History> {
        let id = self.histories.len();
        let history = Arc::new(History::new(id, name));
        self.histories.push(Arc::clone(&history));
        self.current = id;
        history
    }

    #[must_use]
    pub fn current(&self) -> Option<&Arc<History>> {
        self.histories.get(self.current)
    }

    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Arc<History>> {
        self.histories.get(id)
    }

    /// Select the next history. A no-op on the last one.
    pub fn next(&mut self) -> Option<&Arc<History>> {
        if self.current + 1 < self.histories.len() {
            self.current += 1;
        }
        self.current()
    }

    /// Select the previous history. A no-op on the first one.
    pub fn prev(&mut self) -> Option<&Arc<History>> {
        self.current = self.current.saturating_sub(1);
        self.current()
    }

    /// Select history `id`. Out-of-range ids leave the selection unchanged.
    pub fn select(&mut self, id: usize) -> bool {
        if id < self.histories.len() {
            self.current = id;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<History>> {
        self.histories.iter()
    }
}
