//! Configuration module for nodeflow
//!
//! This module handles:
//! - Persistent user settings (`settings.toml`)
//! - The per-session configuration a [`Container`](crate::pipeline::Container)
//!   consults when nodes are chained
//! - Scratch files under the data directory
//!
//! # App Data Location
//!
//! Settings and scratch files live in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.nodeflow/`
//! - **macOS**: `~/Library/Application Support/dev.nodeflow/`
//! - **Windows**: `%APPDATA%\dev.nodeflow\`
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::config::{SessionConfig, Settings};
//!
//! let settings = Settings::load_or_default();
//! let session = SessionConfig::from(&settings);
//! let container = Container::with_config(payload, session);
//! ```

pub mod temp_file;

pub use temp_file::TempFile;

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.nodeflow";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.toml";

/// Default number of status messages kept per container
pub const DEFAULT_STATUS_HISTORY: usize = 32;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        FlowError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            FlowError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SETTINGS_FILE))
}

// ==================== Settings ====================

/// User settings that persist across sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Generate editable controls for nodes as they are chained
    #[serde(default = "default_true")]
    pub show_controls: bool,

    /// Number of status messages each container keeps
    #[serde(default = "default_status_history")]
    pub status_history: usize,

    /// Directory for scratch files (defaults to the app data directory)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Enable dark mode in the desktop session
    #[serde(default = "default_true")]
    pub dark_mode: bool,

    /// Provenance file written by the last desktop session
    #[serde(default)]
    pub last_provenance: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_status_history() -> usize {
    DEFAULT_STATUS_HISTORY
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_controls: true,
            status_history: DEFAULT_STATUS_HISTORY,
            data_dir: None,
            dark_mode: true,
            last_provenance: None,
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = settings_path().ok_or_else(|| {
            FlowError::Config("Could not determine settings path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| FlowError::Config(format!("Failed to read settings: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| FlowError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Load settings, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(SETTINGS_FILE))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FlowError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| FlowError::Config(format!("Failed to write settings: {}", e)))
    }

    /// Directory for scratch files
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(app_data_dir)
    }
}

// ==================== Session Config ====================

/// Configuration scoped to one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Ask the bound control binder for controls when a node is chained
    pub show_controls: bool,
    /// Number of status messages kept
    pub status_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            show_controls: true,
            status_history: DEFAULT_STATUS_HISTORY,
        }
    }
}

impl SessionConfig {
    /// A session that never generates controls (scripts, tests, batch runs).
    pub fn headless() -> Self {
        Self {
            show_controls: false,
            ..Self::default()
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            show_controls: settings.show_controls,
            status_history: settings.status_history,
        }
    }
}
