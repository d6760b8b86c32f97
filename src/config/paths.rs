//! Path management for cryptsync
//!
//! Resolves where settings, run journals and lock markers live.
//!
//! ## Path Resolution Order
//!
//! 1. `CRYPTSYNC_HOME` environment variable (if set)
//! 2. The platform configuration directory joined with `cryptsync`
//!    (`~/.config/cryptsync` on Linux)

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::SyncError;

/// Environment variable overriding the cryptsync home directory
pub const HOME_ENV: &str = "CRYPTSYNC_HOME";

/// Manages all paths used by cryptsync
#[derive(Debug, Clone)]
pub struct SyncPaths {
    /// Base directory for all cryptsync state
    base_dir: PathBuf,
}

impl SyncPaths {
    /// Create a new SyncPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, SyncError> {
        let base_dir = if let Ok(custom) = std::env::var(HOME_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create SyncPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the directory holding one journal file per run
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the directory holding repository lock markers
    pub fn lock_dir(&self) -> PathBuf {
        self.base_dir.join("locks")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), SyncError> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to create base directory: {}", e))
        })?;

        std::fs::create_dir_all(self.logs_dir()).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to create logs directory: {}", e))
        })?;

        std::fs::create_dir_all(self.lock_dir()).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to create lock directory: {}", e))
        })?;

        Ok(())
    }

    /// Check if a settings file has been written
    pub fn is_configured(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, SyncError> {
    let dirs = BaseDirs::new()
        .ok_or_else(|| SyncError::Config("Could not determine home directory".into()))?;
    Ok(dirs.config_dir().join("cryptsync"))
}
