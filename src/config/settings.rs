//! Global configuration management
//!
//! Reads optional user settings from `config.toml` in the config directory.
//! Every key is optional; command-line flags take precedence over it.
//!
//! ```toml
//! index_url = "https://mirror.example.com"
//! target = "./wheels"
//! parallel = 8
//! retries = 5
//! color = false
//! ```

use crate::config::{defaults, urls};
use crate::infra::dirs::LockfetchDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Global configuration for lockfetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default package index URL
    pub index_url: Option<String>,

    /// Default download directory
    pub target: Option<PathBuf>,

    /// Number of parallel downloads
    pub parallel: Option<usize>,

    /// Download retry attempts
    pub retries: Option<u32>,

    /// Enable colored output
    pub color: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load(dirs: &LockfetchDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Get the effective index URL
    #[must_use]
    pub fn index_url(&self) -> &str {
        self.index_url.as_deref().unwrap_or(urls::PYPI_URL)
    }

    /// Get the effective download directory
    #[must_use]
    pub fn target(&self) -> PathBuf {
        self.target
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_TARGET))
    }

    /// Get the effective number of parallel downloads, at least one
    #[must_use]
    pub fn parallel(&self) -> usize {
        self.parallel
            .unwrap_or(defaults::DEFAULT_PARALLEL_DOWNLOADS)
            .max(1)
    }

    /// Get the effective number of download attempts
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or(defaults::MAX_DOWNLOAD_RETRIES)
    }

    /// Whether colored output is enabled
    #[must_use]
    pub fn color(&self) -> bool {
        self.color.unwrap_or(true)
    }
}
