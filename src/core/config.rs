//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{GtvError, Result};
use crate::core::paths;

/// Full gotestview configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub ui: UiConfig,
    pub rerun: RerunConfig,
    pub export: ExportConfig,
    pub paths: PathsConfig,
}

/// Channel sizing for the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Capacity of the primary stream channel. Sized to absorb bursts from
    /// `go test -json ./...` without blocking the reader.
    pub channel_capacity: usize,
    /// Capacity of each rerun's channel.
    pub rerun_channel_capacity: usize,
}

/// Render loop timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    /// Spinner animation period.
    pub tick_interval_ms: u64,
    /// Terminal input poll timeout per loop iteration.
    pub poll_interval_ms: u64,
}

/// How reruns invoke the Go toolchain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RerunConfig {
    pub go_binary: String,
    /// Extra arguments inserted after `go test -json` (e.g. `-count=1`).
    pub extra_args: Vec<String>,
}

/// Export file placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
}

/// Resolved file locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
            rerun_channel_capacity: 100,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            poll_interval_ms: 50,
        }
    }
}

impl Default for RerunConfig {
    fn default() -> Self {
        Self {
            go_binary: "go".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_prefix: "gtv-export".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: paths::default_config_file(),
            activity_log: paths::default_activity_log(),
        }
    }
}

impl UiConfig {
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        paths::default_config_file()
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| GtvError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml(&raw)?
        } else if path.is_some() {
            return Err(GtvError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without touching the environment.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_usize(
            "GTV_INGEST_CHANNEL_CAPACITY",
            &mut self.ingest.channel_capacity,
        )?;
        set_env_usize(
            "GTV_RERUN_CHANNEL_CAPACITY",
            &mut self.ingest.rerun_channel_capacity,
        )?;
        set_env_u64("GTV_UI_TICK_INTERVAL_MS", &mut self.ui.tick_interval_ms)?;
        set_env_u64("GTV_UI_POLL_INTERVAL_MS", &mut self.ui.poll_interval_ms)?;

        if let Some(raw) = env_var("GTV_GO_BINARY") {
            self.rerun.go_binary = raw;
        }
        if let Some(raw) = env_var("GTV_EXPORT_DIR") {
            self.export.directory = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("GTV_EXPORT_PREFIX") {
            self.export.file_prefix = raw;
        }
        if let Some(raw) = env_var("GTV_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.channel_capacity == 0 || self.ingest.rerun_channel_capacity == 0 {
            return Err(GtvError::InvalidConfig {
                details: "ingest channel capacities must be >= 1".to_string(),
            });
        }
        if self.ui.tick_interval_ms < 10 {
            return Err(GtvError::InvalidConfig {
                details: format!(
                    "ui.tick_interval_ms must be >= 10, got {}",
                    self.ui.tick_interval_ms
                ),
            });
        }
        if self.ui.poll_interval_ms == 0 || self.ui.poll_interval_ms > 1000 {
            return Err(GtvError::InvalidConfig {
                details: format!(
                    "ui.poll_interval_ms must be in [1, 1000], got {}",
                    self.ui.poll_interval_ms
                ),
            });
        }
        if self.rerun.go_binary.trim().is_empty() {
            return Err(GtvError::InvalidConfig {
                details: "rerun.go_binary must not be empty".to_string(),
            });
        }
        let prefix = &self.export.file_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(GtvError::InvalidConfig {
                details: format!("export.file_prefix must be a bare file name, got {prefix:?}"),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_u64(name: &str, slot: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<u64>().map_err(|error| GtvError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_usize(name: &str, slot: &mut usize) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<usize>().map_err(|error| GtvError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}
