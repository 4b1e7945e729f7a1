//! Default locations for configuration, activity logs and exports.

use std::env;
use std::path::{Path, PathBuf};

/// Application directory name under the XDG base directories.
const APP_DIR: &str = "gtv";

/// User home directory, falling back to `/tmp` when `HOME` is unset.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[GTV-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

/// `$XDG_CONFIG_HOME/gtv`, or `~/.config/gtv`.
pub fn config_home() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME").unwrap_or_else(|| home_dir().join(".config").join(APP_DIR))
}

/// `$XDG_DATA_HOME/gtv`, or `~/.local/share/gtv`.
pub fn data_home() -> PathBuf {
    xdg_dir("XDG_DATA_HOME")
        .unwrap_or_else(|| home_dir().join(".local").join("share").join(APP_DIR))
}

/// Default config file path.
pub fn default_config_file() -> PathBuf {
    config_home().join("config.toml")
}

/// Default JSONL activity log path.
pub fn default_activity_log() -> PathBuf {
    data_home().join("activity.jsonl")
}

/// Join an export file name onto the configured export directory.
///
/// Relative export directories are resolved against the current working
/// directory so the path reported to the user is unambiguous.
pub fn export_path(directory: &Path, file_name: &str) -> PathBuf {
    let dir = if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| directory.to_path_buf(), |cwd| cwd.join(directory))
    };
    dir.join(file_name)
}

fn xdg_dir(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .map(|p| p.join(APP_DIR))
}
