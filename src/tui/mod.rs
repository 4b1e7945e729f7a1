//! Interactive viewer: history list, result tree and log panes.
//!
//! Elm-style seams: `model` holds render-owned state, `update` applies
//! messages, `render` draws frames, and `runtime` owns the terminal and the
//! event loop.

#![allow(missing_docs)]

pub mod input;
pub mod layout;
pub mod model;
pub mod render;
pub mod runtime;
pub mod terminal_guard;
pub mod theme;
pub mod update;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod test_properties;
#[cfg(test)]
mod test_scenario_drills;

pub use runtime::{CommandExecutor, ViewerRuntimeConfig, run_viewer};
