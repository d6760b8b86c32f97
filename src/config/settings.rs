//! User settings for cryptsync
//!
//! The settings file is written once by the user (or an installer) and read
//! once per run. [`Settings::to_context`] validates it and produces the
//! immutable [`SyncContext`] handed to the orchestrators.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::context::{OperatorIdentity, RecipientSet, SyncContext};
use super::paths::SyncPaths;
use crate::error::SyncError;

/// Log retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRetention {
    /// Journal files older than this many days are pruned after a successful run
    pub max_age_days: u32,
}

impl Default for LogRetention {
    fn default() -> Self {
        Self { max_age_days: 30 }
    }
}

/// User settings for cryptsync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Directory holding the note graph
    #[serde(default)]
    pub graph_path: Option<PathBuf>,

    /// Remote locator, without the transport scheme prefix
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Recipient identities (key ids, fingerprints or e-mail addresses)
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Name of the bound remote
    #[serde(default = "default_remote_name")]
    pub remote_name: String,

    /// Branch pushed and pulled
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Author name recorded on backup commits
    #[serde(default = "default_author_name")]
    pub author_name: String,

    /// Author e-mail recorded on backup commits
    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// Patterns written to the exclusion list of a new repository
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,

    /// Top-level items a restored graph is expected to contain
    #[serde(default = "default_expected_markers")]
    pub expected_markers: Vec<String>,

    /// Journal retention policy
    #[serde(default)]
    pub log_retention: LogRetention,
}

fn default_schema_version() -> u32 {
    1
}

fn default_remote_name() -> String {
    "backup".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_author_name() -> String {
    "cryptsync".to_string()
}

fn default_author_email() -> String {
    "cryptsync@localhost".to_string()
}

fn default_exclusions() -> Vec<String> {
    [".DS_Store", "Thumbs.db", "logseq/bak/", "logseq/.recycle/", ".trash/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_expected_markers() -> Vec<String> {
    ["pages", "journals", "logseq/config.edn"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            graph_path: None,
            remote_url: None,
            recipients: Vec::new(),
            remote_name: default_remote_name(),
            branch: default_branch(),
            author_name: default_author_name(),
            author_email: default_author_email(),
            exclusions: default_exclusions(),
            expected_markers: default_expected_markers(),
            log_retention: LogRetention::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &SyncPaths) -> Result<Self, SyncError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                SyncError::Config(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                SyncError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SyncPaths) -> Result<(), SyncError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Validate the settings and build the per-run context
    ///
    /// The graph path, remote locator and recipients must all be non-empty.
    /// An empty recipient list is reported as [`SyncError::MissingRecipients`].
    pub fn to_context(&self, paths: &SyncPaths) -> Result<SyncContext, SyncError> {
        let local_path = match &self.graph_path {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => return Err(SyncError::Config("graph_path is not set".into())),
        };

        let remote_locator = match self.remote_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err(SyncError::Config("remote_url is not set".into())),
        };

        let recipients: RecipientSet = self.recipients.iter().cloned().collect();
        if recipients.is_empty() {
            return Err(SyncError::MissingRecipients);
        }

        if self.remote_name.trim().is_empty() {
            return Err(SyncError::Config("remote_name cannot be empty".into()));
        }
        if self.branch.trim().is_empty() {
            return Err(SyncError::Config("branch cannot be empty".into()));
        }

        Ok(SyncContext {
            local_path,
            remote_locator,
            recipients,
            remote_name: self.remote_name.trim().to_string(),
            branch: self.branch.trim().to_string(),
            identity: OperatorIdentity::new(&self.author_name, &self.author_email),
            exclusions: self.exclusions.clone(),
            expected_markers: self.expected_markers.clone(),
            log_max_age: Duration::from_secs(
                u64::from(self.log_retention.max_age_days) * 24 * 60 * 60,
            ),
            lock_dir: paths.lock_dir(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn configured() -> Settings {
        Settings {
            graph_path: Some(PathBuf::from("/home/me/notes")),
            remote_url: Some("git@example.org:me/notes.git".into()),
            recipients: vec!["alice@example.org".into()],
            ..Settings::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.remote_name, "backup");
        assert_eq!(settings.branch, "main");
        assert_eq!(settings.log_retention.max_age_days, 30);
        assert!(settings.recipients.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SyncPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = configured();
        settings.branch = "trunk".into();
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.branch, "trunk");
        assert_eq!(loaded.recipients, vec!["alice@example.org".to_string()]);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SyncPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(
            paths.settings_file(),
            r#"{"graph_path": "/notes", "remote_url": "rsync://host/notes", "recipients": ["ABCD"]}"#,
        )
        .unwrap();

        let settings = Settings::load_or_create(&paths).unwrap();
        assert_eq!(settings.remote_name, "backup");
        assert_eq!(settings.expected_markers.len(), 3);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SyncPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), "{ not json").unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_to_context() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SyncPaths::with_base_dir(temp_dir.path().to_path_buf());

        let context = configured().to_context(&paths).unwrap();
        assert_eq!(context.local_path, PathBuf::from("/home/me/notes"));
        assert_eq!(context.recipients.joined(), "alice@example.org");
        assert_eq!(context.lock_dir, paths.lock_dir());
        assert_eq!(context.log_max_age, Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn test_to_context_requires_fields() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SyncPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = configured();
        settings.remote_url = Some("   ".into());
        assert!(matches!(
            settings.to_context(&paths),
            Err(SyncError::Config(_))
        ));

        let mut settings = configured();
        settings.graph_path = None;
        assert!(matches!(
            settings.to_context(&paths),
            Err(SyncError::Config(_))
        ));

        let mut settings = configured();
        settings.recipients = vec!["  ".into()];
        assert!(matches!(
            settings.to_context(&paths),
            Err(SyncError::MissingRecipients)
        ));
    }
}
