//! Service settings

use std::path::{Path, PathBuf};

use rf_control::ServerConfig;
use rf_device::{ConfigError, SimulatorConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the listen address
pub const LISTEN_ENV: &str = "RF_CONTROL_LISTEN";

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid simulator settings in {path}: {source}")]
    Invalid { path: PathBuf, source: ConfigError },

    #[error("failed to write settings: {0}")]
    Write(String),

    #[error("could not determine settings path")]
    NoPath,
}

/// Service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Listener and worker pool
    pub server: ServerConfig,
    /// Simulated hardware behavior
    pub simulator: SimulatorConfig,
}

impl Settings {
    /// Get the XDG config directory for rf-control
    /// Uses $XDG_CONFIG_HOME/rf-control, falls back to ~/.config/rf-control
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("rf-control"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("rf-control"))
    }

    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from an explicit file; a missing file is an error
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&text).map_err(|e| SettingsError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        settings
            .simulator
            .validate()
            .map_err(|source| SettingsError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(settings)
    }

    /// Load settings from the default path, or defaults if there is no file
    pub fn load() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save settings to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::Write(format!("failed to create settings directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SettingsError::Write(format!("failed to serialize settings: {}", e)))?;

        std::fs::write(path, json).map_err(|e| SettingsError::Write(e.to_string()))
    }

    /// Save settings to the default path
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoPath)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        self.apply_listen_override(std::env::var(LISTEN_ENV).ok());
    }

    fn apply_listen_override(&mut self, listen: Option<String>) {
        if let Some(addr) = listen.filter(|a| !a.trim().is_empty()) {
            self.server.listen_addr = addr.trim().to_string();
        }
    }
}
