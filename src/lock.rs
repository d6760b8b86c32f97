//! Per-repository run lock
//!
//! A run takes an exclusive, non-blocking lock on the repository path before
//! mutating anything. The lock is a marker file created with `create_new`, so
//! two processes racing for it cannot both win. A marker left behind by a
//! dead process is treated as stale and replaced.
//!
//! Replacing a stale marker goes through a rename to a per-process name.
//! Only the process whose rename succeeds may retry the create, and it checks
//! the marker it moved aside before deleting it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Contents of a lock marker file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockMarker {
    pub pid: u32,
    pub repository: PathBuf,
    pub acquired_at: DateTime<Utc>,
    /// Owner start time in clock ticks since boot, where the platform reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
}

impl LockMarker {
    /// A live pid only counts when its start time matches the recorded one
    fn is_owner_alive(&self) -> bool {
        if !pid_alive(self.pid) {
            return false;
        }
        match (self.start_time, process_start_time(self.pid)) {
            (Some(recorded), Some(current)) => recorded == current,
            _ => true,
        }
    }
}

/// Held lock; released when dropped
#[derive(Debug)]
pub struct RunLock {
    marker_path: PathBuf,
}

impl RunLock {
    /// Try to take the lock for `repository`, never blocking
    ///
    /// Fails with [`SyncError::AlreadyRunning`] when a live process holds it.
    pub fn acquire(lock_dir: &Path, repository: &Path) -> SyncResult<Self> {
        fs::create_dir_all(lock_dir).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to create lock directory: {}", e))
        })?;

        let repository = absolute(repository);
        let marker_path = lock_dir.join(marker_file_name(&repository));

        // second attempt only after clearing a stale marker
        for _ in 0..2 {
            match Self::create_marker(&marker_path, &repository) {
                Ok(()) => {
                    debug!(lock = %marker_path.display(), "lock acquired");
                    return Ok(Self { marker_path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_held(&marker_path) || !take_over(&marker_path)? {
                        return Err(SyncError::AlreadyRunning(repository));
                    }
                }
                Err(e) => {
                    return Err(SyncError::StorageFailure(format!(
                        "Failed to create lock {}: {}",
                        marker_path.display(),
                        e
                    )))
                }
            }
        }

        Err(SyncError::AlreadyRunning(repository))
    }

    fn create_marker(marker_path: &Path, repository: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(marker_path)?;

        let marker = LockMarker {
            pid: std::process::id(),
            repository: repository.to_path_buf(),
            acquired_at: Utc::now(),
            start_time: process_start_time(std::process::id()),
        };
        let data = serde_json::to_vec_pretty(&marker)?;
        file.write_all(&data)?;
        file.sync_all()
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.marker_path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(lock = %self.marker_path.display(), error = %e, "failed to release lock");
            }
        }
    }
}

/// Flatten an absolute path into a single file name
fn marker_file_name(repository: &Path) -> String {
    let parts: Vec<String> = repository
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().replace('%', "%25")),
            Component::Prefix(prefix) => Some(
                prefix
                    .as_os_str()
                    .to_string_lossy()
                    .replace([':', '\\'], "_"),
            ),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        "root.lock".to_string()
    } else {
        format!("{}.lock", parts.join("%"))
    }
}

fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Whether the marker at `path` still belongs to a running owner
fn is_held(path: &Path) -> bool {
    let data = match fs::read(path) {
        Ok(data) => data,
        // gone since the create attempt: the next create decides
        Err(e) if e.kind() == ErrorKind::NotFound => return false,
        Err(e) => {
            warn!(lock = %path.display(), error = %e, "failed to read lock");
            return true;
        }
    };
    match serde_json::from_slice::<LockMarker>(&data) {
        Ok(marker) if marker.is_owner_alive() => true,
        Ok(marker) => {
            warn!(pid = marker.pid, lock = %path.display(), "found stale lock");
            false
        }
        Err(err) => {
            // a marker mid-write by its owner also lands here
            if is_fresh(path) {
                return true;
            }
            warn!(lock = %path.display(), %err, "found unreadable lock");
            false
        }
    }
}

/// Move a stale marker aside so exactly one process gets to replace it
///
/// Returns `false` when another process got there first.
fn take_over(marker_path: &Path) -> SyncResult<bool> {
    let mut aside = marker_path.as_os_str().to_owned();
    aside.push(format!(".stale.{}", std::process::id()));
    let aside = PathBuf::from(aside);

    match fs::rename(marker_path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    }

    // a competitor may have replaced the marker between our check and the rename
    if is_held(&aside) {
        let restored = fs::hard_link(&aside, marker_path).is_ok();
        if !restored {
            warn!(lock = %marker_path.display(), "could not restore a live lock moved aside");
        }
        remove_if_present(&aside)?;
        return Ok(false);
    }

    warn!(lock = %marker_path.display(), "removing stale lock");
    remove_if_present(&aside)?;
    Ok(true)
}

fn remove_if_present(path: &Path) -> SyncResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn is_fresh(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map_or(false, |age| age.as_secs() < 5)
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    // Linux-only: rely on /proc/<pid> presence to detect liveness
    PathBuf::from("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_alive(pid: u32) -> bool {
    // no portable check: every recorded owner counts as alive
    pid != 0
}

/// Field 22 of `/proc/<pid>/stat`
#[cfg(target_os = "linux")]
fn process_start_time(pid: u32) -> Option<u64> {
    let path = PathBuf::from("/proc").join(pid.to_string()).join("stat");
    parse_start_time(&fs::read_to_string(path).ok()?)
}

#[cfg(not(target_os = "linux"))]
fn process_start_time(_pid: u32) -> Option<u64> {
    None
}

/// The command name may contain spaces and parentheses, so fields are counted
/// from the last `)`, which is followed by field 3
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_start_time(stat: &str) -> Option<u64> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(19)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_marker(path: &Path) -> LockMarker {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let repo = temp.path().join("graph");

        let lock = RunLock::acquire(&lock_dir, &repo).unwrap();
        let marker_path = lock.marker_path().to_path_buf();
        assert!(marker_path.exists());

        let marker = read_marker(&marker_path);
        assert_eq!(marker.pid, std::process::id());

        drop(lock);
        assert!(!marker_path.exists());
    }

    #[test]
    fn test_second_acquire_is_already_running() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let repo = temp.path().join("graph");

        let _held = RunLock::acquire(&lock_dir, &repo).unwrap();
        let err = RunLock::acquire(&lock_dir, &repo).unwrap_err();

        assert!(matches!(err, SyncError::AlreadyRunning(_)));
        assert_eq!(err.exit_code(), crate::error::EXIT_ALREADY_RUNNING);
    }

    #[test]
    fn test_different_repositories_do_not_conflict() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");

        let _a = RunLock::acquire(&lock_dir, &temp.path().join("a")).unwrap();
        let _b = RunLock::acquire(&lock_dir, &temp.path().join("b")).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stale_lock_is_replaced() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let repo = temp.path().join("graph");
        fs::create_dir_all(&lock_dir).unwrap();

        let stale = LockMarker {
            pid: u32::MAX - 1,
            repository: absolute(&repo),
            acquired_at: Utc::now(),
            start_time: None,
        };
        let marker_path = lock_dir.join(marker_file_name(&absolute(&repo)));
        fs::write(&marker_path, serde_json::to_vec(&stale).unwrap()).unwrap();

        let lock = RunLock::acquire(&lock_dir, &repo).unwrap();
        assert_eq!(
            read_marker(lock.marker_path()).pid,
            std::process::id()
        );
    }

    fn write_marker(lock_dir: &Path, repo: &Path, pid: u32, start_time: Option<u64>) -> PathBuf {
        fs::create_dir_all(lock_dir).unwrap();
        let marker = LockMarker {
            pid,
            repository: absolute(repo),
            acquired_at: Utc::now(),
            start_time,
        };
        let marker_path = lock_dir.join(marker_file_name(&absolute(repo)));
        fs::write(&marker_path, serde_json::to_vec(&marker).unwrap()).unwrap();
        marker_path
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reused_pid_is_stale() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let repo = temp.path().join("graph");

        // our own pid is alive, but not the process that wrote this marker
        let current = process_start_time(std::process::id()).unwrap();
        write_marker(&lock_dir, &repo, std::process::id(), Some(current + 1));

        let lock = RunLock::acquire(&lock_dir, &repo).unwrap();
        let marker = read_marker(lock.marker_path());
        assert_eq!(marker.start_time, Some(current));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_matching_start_time_holds_lock() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let repo = temp.path().join("graph");

        let current = process_start_time(std::process::id());
        write_marker(&lock_dir, &repo, std::process::id(), current);

        let err = RunLock::acquire(&lock_dir, &repo).unwrap_err();
        assert!(matches!(err, SyncError::AlreadyRunning(_)));
    }

    #[test]
    fn test_take_over_lost_to_another_process() {
        let temp = TempDir::new().unwrap();
        let marker_path = temp.path().join("graph.lock");

        // the stale marker was already moved away by a competitor
        assert!(!take_over(&marker_path).unwrap());
    }

    #[test]
    fn test_take_over_restores_a_live_marker() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let repo = temp.path().join("graph");

        // a competitor replaced the stale marker before our rename
        let current = process_start_time(std::process::id());
        let marker_path = write_marker(&lock_dir, &repo, std::process::id(), current);

        assert!(!take_over(&marker_path).unwrap());
        assert_eq!(read_marker(&marker_path).pid, std::process::id());
        assert_eq!(fs::read_dir(&lock_dir).unwrap().count(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_take_over_removes_a_stale_marker() {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let repo = temp.path().join("graph");
        let marker_path = write_marker(&lock_dir, &repo, u32::MAX - 1, None);

        assert!(take_over(&marker_path).unwrap());
        assert_eq!(fs::read_dir(&lock_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_parse_start_time() {
        let stat = "4242 (my (odd) cmd) S 1 4242 4242 0 -1 4194560 100 0 0 0 \
                    5 3 0 0 20 0 1 0 987654 1000 200";
        assert_eq!(parse_start_time(stat), Some(987654));
        assert_eq!(parse_start_time("4242 (short) S 1"), None);
        assert_eq!(parse_start_time("no parens"), None);
    }

    #[test]
    fn test_marker_without_start_time_parses() {
        let marker: LockMarker = serde_json::from_str(
            r#"{"pid": 7, "repository": "/notes", "acquired_at": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(marker.start_time, None);
    }

    #[test]
    fn test_marker_file_name() {
        assert_eq!(
            marker_file_name(Path::new("/home/me/notes")),
            "home%me%notes.lock"
        );
        assert_eq!(marker_file_name(Path::new("/")), "root.lock");
        assert_eq!(marker_file_name(Path::new("/a%b")), "a%25b.lock");
    }
}
