//! Configuration module for cryptsync
//!
//! This module provides configuration management including:
//! - Path resolution for settings, journals and locks
//! - Settings persistence
//! - The validated per-run context

pub mod context;
pub mod paths;
pub mod settings;

pub use context::{OperatorIdentity, RecipientSet, SyncContext};
pub use paths::SyncPaths;
pub use settings::Settings;
