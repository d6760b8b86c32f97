//! Journal housekeeping
//!
//! Journal files are pruned by age. The creation time is taken from the file
//! name, not from filesystem metadata, so copying the logs directory around
//! does not reset retention.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::entry::RunKind;
use crate::error::{SyncError, SyncResult};

/// Metadata about a journal file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalInfo {
    pub path: PathBuf,
    pub kind: RunKind,
    pub created_at: DateTime<Utc>,
}

/// List journal files in `logs_dir`, newest first
pub fn list_journals(logs_dir: &Path) -> SyncResult<Vec<JournalInfo>> {
    if !logs_dir.exists() {
        return Ok(Vec::new());
    }

    let mut journals = Vec::new();

    for entry in fs::read_dir(logs_dir)
        .map_err(|e| SyncError::StorageFailure(format!("Failed to read logs directory: {}", e)))?
    {
        let entry = entry.map_err(|e| {
            SyncError::StorageFailure(format!("Failed to read directory entry: {}", e))
        })?;

        let path = entry.path();
        if let Some(info) = parse_journal_info(&path) {
            journals.push(info);
        }
    }

    journals.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(journals)
}

/// Most recent journal of `kind`
pub fn latest_journal(logs_dir: &Path, kind: RunKind) -> SyncResult<Option<JournalInfo>> {
    Ok(list_journals(logs_dir)?
        .into_iter()
        .find(|journal| journal.kind == kind))
}

/// Delete journals older than `max_age`, never touching `keep`
pub fn prune(logs_dir: &Path, max_age: Duration, keep: Option<&Path>) -> SyncResult<Vec<PathBuf>> {
    let max_age = chrono::Duration::from_std(max_age)
        .map_err(|e| SyncError::Config(format!("Invalid log retention age: {}", e)))?;
    let cutoff = Utc::now() - max_age;
    let mut deleted = Vec::new();

    for journal in list_journals(logs_dir)? {
        if journal.created_at >= cutoff || keep == Some(journal.path.as_path()) {
            continue;
        }

        fs::remove_file(&journal.path).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to delete old journal: {}", e))
        })?;
        deleted.push(journal.path);
    }

    Ok(deleted)
}

fn parse_journal_info(path: &Path) -> Option<JournalInfo> {
    if !path.is_file() {
        return None;
    }

    let filename = path.file_name()?.to_str()?;
    let stem = filename.strip_suffix(".log")?;
    let (prefix, date_part) = stem.split_once('-')?;
    let kind = RunKind::from_prefix(prefix)?;
    let created_at = parse_journal_timestamp(date_part)?;

    Some(JournalInfo {
        path: path.to_path_buf(),
        kind,
        created_at,
    })
}

/// Parse `YYYYMMDD-HHMMSS-mmm`, optionally followed by `-<n>`
fn parse_journal_timestamp(date_str: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = date_str.split('-').collect();
    if parts.len() < 3 || parts.len() > 4 {
        return None;
    }

    let date_part = parts[0];
    let time_part = parts[1];
    let millis: u32 = parts[2].parse().ok()?;

    if date_part.len() != 8 || time_part.len() != 6 {
        return None;
    }
    // byte slicing below needs single-byte characters
    if !date_part.is_ascii() || !time_part.is_ascii() {
        return None;
    }

    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;

    Some(DateTime::from_naive_utc_and_offset(
        NaiveDateTime::new(date, time),
        Utc,
    ))
}
