//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use gotestview::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{GtvError, Result};

// Model
pub use crate::model::event::{Action, TestEvent, decode_event};
pub use crate::model::status::{TestStatus, is_test_running, resolve_test_status};
pub use crate::model::tree::{NodeId, NodeRef, ResultTree, TestKey, TreeRow};

// Sessions
pub use crate::session::history::{History, HistoryState, Results};
pub use crate::session::manager::HistoryManager;
pub use crate::session::rerun::RerunTarget;

// Collection
pub use crate::collector::runner::{GoTestExecutor, RunOutcome, TestExecutor};
pub use crate::collector::stream::{export_events, import_events, read_event_stream};
pub use crate::ingest::{IngestUpdate, InputSource, RerunLauncher, start_primary};

// Search
pub use crate::search::{SearchState, find_matches};
