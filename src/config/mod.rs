//! Persistent connection settings.
//!
//! A single JSON object holding the endpoint, credentials and output
//! folder, read once at startup and rewritten whenever the connection
//! parameters or the output folder change. Credentials are opaque
//! pass-through values; nothing here validates them.

pub mod paths;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SkiffError;

/// Verbosity level controlling tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    /// Derive from the CLI's quiet flag and repeated `-v` count.
    pub fn from_flags(quiet: bool, verbose_count: u8) -> Self {
        if quiet {
            Verbosity::Quiet
        } else {
            match verbose_count {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }

    /// Return the tracing filter string for this verbosity level.
    pub fn as_tracing_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

/// Connection and output settings, persisted as `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
    /// When the connection parameters were last saved.
    #[serde(default)]
    pub last_connected: Option<DateTime<Utc>>,
}

fn default_output_folder() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            output_folder: default_output_folder(),
            last_connected: None,
        }
    }
}

impl Settings {
    /// Load settings from `config_dir/config.json`.
    ///
    /// A missing file yields defaults. A corrupted file logs a warning
    /// and falls back to defaults; a read error is never fatal.
    pub fn load(config_dir: &Path) -> Settings {
        let path = paths::settings_file(config_dir);
        if !path.exists() {
            return Settings::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Corrupted config.json, using defaults: {}", e);
                    Settings::default()
                }
            },
            Err(e) => {
                tracing::warn!("Could not read config.json, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    /// Atomically save to `config_dir/config.json`.
    ///
    /// Writes to a temporary file first, then renames for crash safety.
    pub fn save(&self, config_dir: &Path) -> Result<(), SkiffError> {
        let path = paths::settings_file(config_dir);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Record new connection parameters, stamping `last_connected`.
    pub fn set_connection(&mut self, endpoint: String, access_key: String, secret_key: String) {
        self.endpoint = endpoint;
        self.access_key = access_key;
        self.secret_key = secret_key;
        self.last_connected = Some(Utc::now());
    }
}
