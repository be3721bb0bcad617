//! Platform-specific directory management
//!
//! Provides the configuration directories lockfetch reads from: its own
//! config directory (for `config.toml`) and poetry's config directory (for
//! `auth.toml`). Follows XDG on Linux and standard locations on macOS and
//! Windows.
//!
//! Environment variables can override default directories:
//! - `LOCKFETCH_CONFIG_DIR` - Override the lockfetch config directory
//! - `POETRY_CONFIG_DIR` - Override poetry's config directory

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "LOCKFETCH_CONFIG_DIR";
pub const ENV_POETRY_CONFIG_DIR: &str = "POETRY_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "lockfetch";

/// Poetry's application directory name
const POETRY_APP_NAME: &str = "pypoetry";

/// Platform-specific directory provider
#[derive(Debug, Clone)]
pub struct LockfetchDirs {
    config_dir: PathBuf,
    poetry_config_dir: PathBuf,
}

impl LockfetchDirs {
    /// Create a new `LockfetchDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: resolve(ENV_CONFIG_DIR, APP_NAME),
            poetry_config_dir: resolve(ENV_POETRY_CONFIG_DIR, POETRY_APP_NAME),
        }
    }

    /// Create an instance rooted at explicit directories
    #[must_use]
    pub fn from_paths(config_dir: &Path, poetry_config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            poetry_config_dir: poetry_config_dir.to_path_buf(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/lockfetch` or `~/.config/lockfetch`
    /// - macOS: `~/Library/Application Support/lockfetch`
    /// - Windows: `%APPDATA%\lockfetch`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Get the path of poetry's `auth.toml`
    #[must_use]
    pub fn poetry_auth_path(&self) -> PathBuf {
        self.poetry_config_dir.join("auth.toml")
    }
}

impl Default for LockfetchDirs {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a config directory from environment or platform default
fn resolve(var: &str, app: &str) -> PathBuf {
    match env::var(var) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => platform_config_dir(app),
    }
}

/// Get platform-specific config directory
fn platform_config_dir(app: &str) -> PathBuf {
    dirs::config_dir().map(|p| p.join(app)).unwrap_or_else(|| {
        // Fallback to home directory
        dirs::home_dir()
            .map(|h| h.join(".config").join(app))
            .unwrap_or_else(|| PathBuf::from(".").join(".config").join(app))
    })
}
