//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the orchestrators.

pub mod backup;
pub mod config;
pub mod restore;
pub mod status;

pub use backup::handle_backup_command;
pub use config::handle_config_command;
pub use restore::{handle_restore_command, RestoreArgs};
pub use status::handle_status_command;

use crate::error::SyncResult;
use crate::journal::{LogSink, RunJournal};

/// Record a failure that happened before an orchestrator took over
fn journal_failure<T>(journal: &RunJournal, result: SyncResult<T>) -> SyncResult<T> {
    result.map_err(|err| {
        journal.error(&format!("FAILED in START ({}): {}", err.kind(), err));
        err
    })
}
