//! Custom error types for cryptsync
//!
//! This module defines the error hierarchy for backup and restore runs using
//! thiserror. Every variant except [`SyncError::EmptyCommit`] is fatal for the
//! run that produced it.

use std::path::PathBuf;

use thiserror::Error;

/// Exit status used when another run already holds the repository lock
pub const EXIT_ALREADY_RUNNING: i32 = 75;

/// The main error type for cryptsync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required executable or transport helper is not installed
    #[error("Dependency missing: {0}")]
    DependencyMissing(String),

    /// A recipient identity has no usable key in the key authority
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The recipient set is empty
    #[error("No recipients configured: refusing to bind an encrypted remote without participants")]
    MissingRecipients,

    /// Filesystem or local store failure
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// A remote could not be added, removed or configured
    #[error("Remote configuration failed: {0}")]
    RemoteConfigFailure(String),

    /// Push, pull or clone reported a non-zero result
    #[error("Transport failure during {operation}: {message}")]
    TransportFailure {
        operation: &'static str,
        message: String,
    },

    /// The path holds no version store metadata
    #[error("Not a repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// Another run holds the lock for this repository
    #[error("Another run is already in progress for {}", .0.display())]
    AlreadyRunning(PathBuf),

    /// Commit was requested with nothing staged
    #[error("Nothing to commit")]
    EmptyCommit,

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a transport failure for the given operation
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::TransportFailure {
            operation,
            message: message.into(),
        }
    }

    /// Short, stable name of the error kind, used in journal records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DependencyMissing(_) => "DependencyMissing",
            Self::KeyNotFound(_) => "KeyNotFound",
            Self::MissingRecipients => "MissingRecipients",
            Self::StorageFailure(_) => "StorageFailure",
            Self::RemoteConfigFailure(_) => "RemoteConfigFailure",
            Self::TransportFailure { .. } => "TransportFailure",
            Self::NotARepository(_) => "NotARepository",
            Self::AlreadyRunning(_) => "AlreadyRunning",
            Self::EmptyCommit => "EmptyCommit",
            Self::Config(_) => "Config",
        }
    }

    /// Check if this error can be absorbed as a skip instead of failing the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyCommit)
    }

    /// Process exit status for a run that ended with this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AlreadyRunning(_) => EXIT_ALREADY_RUNNING,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageFailure(format!("JSON error: {}", err))
    }
}

/// Result type alias for cryptsync operations
pub type SyncResult<T> = Result<T, SyncError>;
