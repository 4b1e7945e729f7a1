//! GTV-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, GtvError>;

/// Top-level error type for gotestview.
#[derive(Debug, Error)]
pub enum GtvError {
    #[error("[GTV-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[GTV-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[GTV-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[GTV-2001] failed to decode test event: {details}")]
    Decode { details: String },

    #[error("[GTV-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[GTV-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[GTV-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[GTV-3101] no input: {details}")]
    NoInput { details: String },

    #[error("[GTV-4001] test execution failed: {details}")]
    Execution { details: String },

    #[error("[GTV-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl GtvError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "GTV-1001",
            Self::MissingConfig { .. } => "GTV-1002",
            Self::ConfigParse { .. } => "GTV-1003",
            Self::Decode { .. } => "GTV-2001",
            Self::Serialization { .. } => "GTV-2101",
            Self::Io { .. } => "GTV-3002",
            Self::ChannelClosed { .. } => "GTV-3003",
            Self::NoInput { .. } => "GTV-3101",
            Self::Execution { .. } => "GTV-4001",
            Self::Runtime { .. } => "GTV-3900",
        }
    }

    /// Whether the failure should terminate the application.
    ///
    /// Decode, execution and no-input failures are always reported and
    /// recovered from; only I/O on the primary reader and broken runtime
    /// plumbing end the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
                | Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for GtvError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for GtvError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
