//! Event sources: decoded input streams, export files and the Go toolchain.

pub mod runner;
pub mod stream;
