//! Operation journal for cryptsync runs
//!
//! Every backup or restore run records what it did in an append-only journal,
//! one file per run, so a scheduled run that failed overnight can be
//! diagnosed the next morning.
//!
//! # Architecture
//!
//! - `LogSink`: the interface the orchestrators write to
//! - `RunJournal`: JSON-lines file implementation, mirrored to `tracing`
//! - `retention`: age-bounded housekeeping of old journal files
//!
//! # Example
//!
//! ```rust,ignore
//! use cryptsync::journal::{LogSink, RunJournal, RunKind};
//!
//! let journal = RunJournal::start(&paths.logs_dir(), RunKind::Backup)?;
//! journal.info("backup started");
//! journal.prune_older_than(context.log_max_age)?;
//! ```

mod entry;
mod logger;
pub mod retention;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SyncResult;

pub use entry::{LogLevel, LogRecord, RunKind};
pub use logger::{read_journal, RunJournal};
pub use retention::{latest_journal, list_journals, JournalInfo};

/// Destination for operation records
pub trait LogSink {
    /// Record one message; sinks must not fail the run
    fn record(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }

    /// Housekeeping: drop records older than `max_age`
    fn prune_older_than(&self, _max_age: Duration) -> SyncResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

fn mirror_to_tracing(kind: RunKind, level: LogLevel, message: &str) {
    match level {
        LogLevel::Info => tracing::info!(run = %kind, "{}", message),
        LogLevel::Warn => tracing::warn!(run = %kind, "{}", message),
        LogLevel::Error => tracing::error!(run = %kind, "{}", message),
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::cell::RefCell;

    use super::*;
    use crate::error::SyncError;

    /// Sink that keeps records in memory
    #[derive(Default)]
    pub struct MemorySink {
        pub records: RefCell<Vec<LogRecord>>,
        pub prune_calls: RefCell<Vec<Duration>>,
        pub fail_prune: bool,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self, level: LogLevel) -> Vec<String> {
            self.records
                .borrow()
                .iter()
                .filter(|record| record.level == level)
                .map(|record| record.message.clone())
                .collect()
        }

        pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
            self.messages(level).iter().any(|m| m.contains(needle))
        }
    }

    impl LogSink for MemorySink {
        fn record(&self, level: LogLevel, message: &str) {
            self.records.borrow_mut().push(LogRecord::new(level, message));
        }

        fn prune_older_than(&self, max_age: Duration) -> SyncResult<Vec<PathBuf>> {
            self.prune_calls.borrow_mut().push(max_age);
            if self.fail_prune {
                return Err(SyncError::StorageFailure("logs directory is read-only".into()));
            }
            Ok(Vec::new())
        }
    }
}
