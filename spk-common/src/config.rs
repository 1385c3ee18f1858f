//! Configuration loading and root folder resolution

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "SPK_ROOT_FOLDER";
/// Environment variable naming the remote API base URL
pub const REMOTE_API_ENV: &str = "SPK_REMOTE_API";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(value) = config_file_value("root_folder") {
        return PathBuf::from(value);
    }

    default_root_folder()
}

/// Remote API base URL, same priority order as the root folder.
/// `None` means local-only mode (no remote fetch attempts).
pub fn resolve_remote_api(cli_arg: Option<&str>) -> Option<String> {
    if let Some(url) = cli_arg {
        return Some(url.trim_end_matches('/').to_string());
    }
    if let Ok(url) = std::env::var(REMOTE_API_ENV) {
        if !url.is_empty() {
            return Some(url.trim_end_matches('/').to_string());
        }
    }
    config_file_value("remote_api").map(|u| u.trim_end_matches('/').to_string())
}

/// Path of the collections database inside the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("spk.db")
}

/// Read one string key from the TOML config file, if the file exists
fn config_file_value(key: &str) -> Option<String> {
    let config_path = find_config_file().ok()?;
    let content = std::fs::read_to_string(config_path).ok()?;
    let config = toml::from_str::<toml::Value>(&content).ok()?;
    config.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Locate the config file for the platform
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/spk-track/config.toml first, then /etc/spk-track/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("spk-track").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/spk-track/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("spk-track").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("spk-track"))
        .unwrap_or_else(|| PathBuf::from("./spk-track-data"))
}
