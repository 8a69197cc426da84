//! Configuration loading and root folder resolution
//!
//! The data root holds the SQLite database and uploaded assets. Resolution
//! priority:
//! 1. `LOTMAP_ROOT` environment variable
//! 2. TOML config file (`root_folder` key)
//! 3. OS-dependent compiled default

use crate::{Error, Result};
use std::path::PathBuf;

/// Default HTTP port for the back-office service
pub const DEFAULT_PORT: u16 = 5830;

/// Resolve the data root folder
pub fn resolve_root_folder() -> PathBuf {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var("LOTMAP_ROOT") {
        return PathBuf::from(path);
    }

    // Priority 2: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 3: OS-dependent compiled default
    default_root_folder()
}

/// Resolve the HTTP bind port (`LOTMAP_PORT`, falling back to the default)
pub fn resolve_port() -> u16 {
    std::env::var("LOTMAP_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Path of the SQLite database inside the data root
pub fn database_path(root: &std::path::Path) -> PathBuf {
    root.join("lotmap.db")
}

/// Locate the platform config file, if present
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("lotmap").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/lotmap/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data root
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lotmap"))
        .unwrap_or_else(|| PathBuf::from("./lotmap_data"))
}
