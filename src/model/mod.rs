//! Event schema, status resolution and the result tree.

pub mod event;
pub mod status;
pub mod tree;
