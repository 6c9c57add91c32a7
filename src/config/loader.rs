//! Configuration loading and saving.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::schema::Config;
use crate::utils::helpers::{ensure_dir, get_data_path};

/// Default config file: `~/.powerbot/config.json`.
pub fn get_config_path() -> PathBuf {
    get_data_path().join("config.json")
}

/// Load the config, falling back to defaults when the file is missing or
/// unreadable.
pub fn load_config(path: Option<&Path>) -> Config {
    let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str::<Config>(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse config {}: {}", path.display(), e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Write the config as pretty JSON, creating parent directories.
pub fn save_config(config: &Config, path: Option<&Path>) {
    let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    if let Some(parent) = path.parent() {
        ensure_dir(parent);
    }
    match serde_json::to_string_pretty(config) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, json) {
                warn!("Failed to write config {}: {}", path.display(), e);
            } else {
                info!("Saved config to {}", path.display());
            }
        }
        Err(e) => warn!("Failed to serialize config: {}", e),
    }
}
