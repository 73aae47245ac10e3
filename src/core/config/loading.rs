//! Locating and reading the TOML configuration file.

use super::file::ConfigFile;
use crate::core::error::{AppError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_FILE: &str = "email-verifier.toml";
const HOME_CONFIG_DIR: &str = ".email-verifier";
const HOME_CONFIG_FILE: &str = "config.toml";

/// Resolves which configuration file to use.
///
/// An explicit path always wins and must exist. Otherwise `./email-verifier.toml`
/// and then `$HOME/.email-verifier/config.toml` are tried; `None` means run on defaults.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(AppError::Config(format!(
            "Config file '{}' not found",
            path.display()
        )));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    if let Ok(home) = std::env::var("HOME") {
        let in_home = PathBuf::from(home).join(HOME_CONFIG_DIR).join(HOME_CONFIG_FILE);
        if in_home.is_file() {
            return Ok(Some(in_home));
        }
    }

    tracing::debug!("No configuration file found, using defaults");
    Ok(None)
}

/// Reads and parses a configuration file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    tracing::debug!("Loading configuration from {}", path.display());
    let content = fs::read_to_string(path)?;
    let parsed: ConfigFile = toml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse '{}': {}", path.display(), e))
    })?;
    Ok(parsed)
}
