//! Version store adapter
//!
//! The orchestrators only talk to history storage through the
//! [`VersionStore`] trait. [`GitStore`] drives the `git` executable; tests use
//! an in-memory double.
//!
//! # Error mapping
//!
//! - spawn failures: `DependencyMissing`
//! - init/status/stage/commit: `StorageFailure` (`EmptyCommit` when nothing is staged)
//! - remote add/remove/option: `RemoteConfigFailure`
//! - push/pull/clone: `TransportFailure`

mod git;
#[cfg(test)]
pub(crate) mod memory;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::OperatorIdentity;
use crate::error::SyncResult;

pub use git::GitStore;

/// Reference to a version-store-managed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    root: PathBuf,
}

impl RepositoryHandle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Identifier of a commit, opaque to the orchestrators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Abbreviated form for log messages
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(10).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for creating a repository on first use
#[derive(Debug, Clone, Copy)]
pub struct InitOptions<'a> {
    pub identity: &'a OperatorIdentity,
    pub branch: &'a str,
    pub exclusions: &'a [String],
}

/// Contract over a content-addressed version store
///
/// Every mutating primitive is expected to be atomic at the store level, so
/// an interrupted run leaves a state the next run can resume from.
pub trait VersionStore {
    /// Whether the store's tooling is installed
    fn is_available(&self) -> bool;

    /// Whether store metadata exists at `path`
    fn is_initialized(&self, path: &Path) -> bool;

    /// Open an existing repository, failing with `NotARepository`
    fn open(&self, path: &Path) -> SyncResult<RepositoryHandle>;

    /// Return the repository at `path`, creating it first if needed
    ///
    /// An existing repository with history is returned untouched. A new one
    /// gets HEAD on `branch`, the operation identity, the exclusion list and
    /// an initial empty commit. Metadata without any commit is an interrupted
    /// init and is completed the same way.
    fn ensure_initialized(
        &self,
        path: &Path,
        options: InitOptions<'_>,
    ) -> SyncResult<RepositoryHandle>;

    /// True when there are staged, unstaged or untracked (non-excluded) changes
    fn has_pending_changes(&self, repo: &RepositoryHandle) -> SyncResult<bool>;

    fn stage_all(&self, repo: &RepositoryHandle) -> SyncResult<()>;

    /// Commit whatever is staged; `EmptyCommit` if nothing is
    fn commit(&self, repo: &RepositoryHandle, message: &str) -> SyncResult<CommitId>;

    /// Current commit, or `None` on an unborn branch
    fn head(&self, repo: &RepositoryHandle) -> SyncResult<Option<CommitId>>;

    fn configure_identity(
        &self,
        repo: &RepositoryHandle,
        identity: &OperatorIdentity,
    ) -> SyncResult<()>;

    fn remote_names(&self, repo: &RepositoryHandle) -> SyncResult<Vec<String>>;

    fn remove_remote(&self, repo: &RepositoryHandle, name: &str) -> SyncResult<()>;

    fn add_remote(&self, repo: &RepositoryHandle, name: &str, url: &str) -> SyncResult<()>;

    /// Set `remote.<name>.<key>` to `value`, replacing any previous value
    fn set_remote_option(
        &self,
        repo: &RepositoryHandle,
        name: &str,
        key: &str,
        value: &str,
    ) -> SyncResult<()>;

    fn remote_option(
        &self,
        repo: &RepositoryHandle,
        name: &str,
        key: &str,
    ) -> SyncResult<Option<String>>;

    fn push(&self, repo: &RepositoryHandle, remote: &str, branch: &str) -> SyncResult<()>;

    /// Fast-forward `branch` from `remote`
    fn pull(&self, repo: &RepositoryHandle, remote: &str, branch: &str) -> SyncResult<()>;

    /// Clone `url` into `dest`, naming the remote `remote`
    ///
    /// `remote_options` are `(key, value)` pairs set on the new remote before
    /// any data is fetched.
    fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        remote: &str,
        branch: &str,
        remote_options: &[(String, String)],
    ) -> SyncResult<RepositoryHandle>;
}
