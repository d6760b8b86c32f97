//! Per-run journal file
//!
//! Each run writes its own JSON-lines file under the logs directory, named
//! `<kind>-<YYYYMMDD-HHMMSS-mmm>.log`. Records are appended and flushed one
//! at a time; the file is never rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::entry::{LogLevel, LogRecord, RunKind};
use super::retention;
use super::LogSink;
use crate::error::{SyncError, SyncResult};

/// Append-only journal for one run
#[derive(Debug)]
pub struct RunJournal {
    kind: RunKind,
    log_path: PathBuf,
    logs_dir: PathBuf,
}

impl RunJournal {
    /// Create the journal file for a new run
    pub fn start(logs_dir: &Path, kind: RunKind) -> SyncResult<Self> {
        fs::create_dir_all(logs_dir).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to create logs directory: {}", e))
        })?;

        let now = Utc::now();
        let stem = journal_stem(kind, now);

        for attempt in 0..100u32 {
            let filename = if attempt == 0 {
                format!("{}.log", stem)
            } else {
                format!("{}-{}.log", stem, attempt)
            };
            let log_path = logs_dir.join(filename);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&log_path)
            {
                Ok(_) => {
                    return Ok(Self {
                        kind,
                        log_path,
                        logs_dir: logs_dir.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(SyncError::StorageFailure(format!(
                        "Failed to create journal: {}",
                        e
                    )))
                }
            }
        }

        Err(SyncError::StorageFailure(format!(
            "Failed to allocate a journal file name for {}",
            stem
        )))
    }

    /// Append one record, flushing immediately
    pub fn append(&self, record: &LogRecord) -> SyncResult<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .map_err(|e| SyncError::StorageFailure(format!("Failed to open journal: {}", e)))?;

        let json = serde_json::to_string(record)?;

        writeln!(file, "{}", json)
            .map_err(|e| SyncError::StorageFailure(format!("Failed to write journal: {}", e)))?;

        file.flush()
            .map_err(|e| SyncError::StorageFailure(format!("Failed to flush journal: {}", e)))?;

        Ok(())
    }

    /// Read back every record of this run
    pub fn read_all(&self) -> SyncResult<Vec<LogRecord>> {
        read_journal(&self.log_path)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

impl LogSink for RunJournal {
    fn record(&self, level: LogLevel, message: &str) {
        super::mirror_to_tracing(self.kind, level, message);
        if let Err(err) = self.append(&LogRecord::new(level, message)) {
            tracing::warn!(journal = %self.log_path.display(), %err, "journal write failed");
        }
    }

    fn prune_older_than(&self, max_age: Duration) -> SyncResult<Vec<PathBuf>> {
        retention::prune(&self.logs_dir, max_age, Some(&self.log_path))
    }
}

/// Read all records from a journal file, oldest first
pub fn read_journal(path: &Path) -> SyncResult<Vec<LogRecord>> {
    let file = File::open(path)
        .map_err(|e| SyncError::StorageFailure(format!("Failed to open journal: {}", e)))?;

    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            SyncError::StorageFailure(format!(
                "Failed to read journal line {}: {}",
                line_num + 1,
                e
            ))
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let record: LogRecord = serde_json::from_str(&line).map_err(|e| {
            SyncError::StorageFailure(format!(
                "Failed to parse journal record at line {}: {}",
                line_num + 1,
                e
            ))
        })?;

        records.push(record);
    }

    Ok(records)
}

fn journal_stem(kind: RunKind, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{:03}",
        kind.as_str(),
        at.format("%Y%m%d-%H%M%S"),
        at.timestamp_subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_start_creates_named_file() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::start(temp.path(), RunKind::Backup).unwrap();

        assert!(journal.path().exists());
        let name = journal.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("backup-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_two_runs_get_separate_files() {
        let temp = TempDir::new().unwrap();
        let first = RunJournal::start(temp.path(), RunKind::Backup).unwrap();
        let second = RunJournal::start(temp.path(), RunKind::Backup).unwrap();

        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_records_round_trip_in_order() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::start(temp.path(), RunKind::Restore).unwrap();

        journal.info("cloning");
        journal.warn("marker missing: journals");
        journal.error("clone failed");

        let records = journal.read_all().unwrap();
        let levels: Vec<LogLevel> = records.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warn, LogLevel::Error]);
        assert_eq!(records[1].message, "marker missing: journals");
    }

    #[test]
    fn test_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::start(temp.path(), RunKind::Pull).unwrap();
        journal.info("pulled");
        let path = journal.path().to_path_buf();
        drop(journal);

        let records = read_journal(&path).unwrap();
        assert_eq!(records.len(), 1);
    }
}
