//! Platform-specific config directory helpers.
//!
//! Uses the `dirs` crate so settings land in the conventional place:
//! `~/.config/skiff/` on Linux, `%APPDATA%\skiff\` on Windows,
//! `~/Library/Application Support/skiff/` on macOS.

use std::path::PathBuf;

use crate::error::SkiffError;

/// Get the skiff config directory, creating it if needed.
pub fn skiff_config_dir() -> Result<PathBuf, SkiffError> {
    let base = dirs::config_dir()
        .ok_or_else(|| SkiffError::Config("Could not determine config directory".into()))?;
    let skiff_dir = base.join("skiff");
    if !skiff_dir.exists() {
        std::fs::create_dir_all(&skiff_dir)?;
    }
    Ok(skiff_dir)
}

/// Path of the settings file inside a config directory.
pub fn settings_file(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join("config.json")
}
