#![forbid(unsafe_code)]

//! gotestview (gtv): a live terminal viewer for `go test -json` streams.
//!
//! Events are decoded line by line, grouped per test into a History, and
//! shown as a package/test tree whose nodes follow slash-separated subtest
//! names. Any package or test can be rerun into a new History without
//! touching earlier ones; Histories can be exported to NDJSON and imported
//! back later.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use gotestview::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use gotestview::session::history::History;
//! use gotestview::collector::stream::import_events;
//! ```

pub mod prelude;

pub mod collector;
pub mod core;
pub mod ingest;
pub mod logger;
pub mod model;
pub mod search;
pub mod session;
#[cfg(feature = "tui")]
pub mod tui;
