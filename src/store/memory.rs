//! In-memory version store used by orchestrator tests.
//!
//! The working tree is simulated by a dirty flag; remotes and their options
//! are tracked as plain maps, and every call is recorded so tests can assert
//! what was (and was not) mutated.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::{CommitId, InitOptions, RepositoryHandle, VersionStore};
use crate::config::OperatorIdentity;
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRemote {
    pub url: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    pub available: Cell<bool>,
    pub initialized: RefCell<HashSet<PathBuf>>,
    pub dirty: Cell<bool>,
    /// Changes disappear between detection and staging
    pub vanish_on_stage: Cell<bool>,
    staged: Cell<bool>,
    pub commits: RefCell<Vec<String>>,
    pub remotes: RefCell<BTreeMap<String, MemoryRemote>>,
    pub identity: RefCell<Option<OperatorIdentity>>,
    pub pushes: RefCell<Vec<(String, String)>>,
    pub pulls: RefCell<Vec<(String, String)>>,
    pub push_error: RefCell<Option<String>>,
    pub add_remote_error: RefCell<Option<String>>,
    pub clone_error: RefCell<Option<String>>,
    /// Files written into the destination of a successful clone
    pub clone_files: RefCell<Vec<String>>,
    pub calls: RefCell<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.available.set(true);
        store
    }

    /// Simulate an edit in the working tree
    pub fn touch(&self) {
        self.dirty.set(true);
    }

    pub fn mark_initialized(&self, path: &Path) {
        self.initialized.borrow_mut().insert(path.to_path_buf());
    }

    pub fn commit_count(&self) -> usize {
        self.commits.borrow().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that change repository or remote state
    pub fn mutating_calls(&self) -> Vec<String> {
        const READS: [&str; 5] = [
            "is_initialized",
            "open",
            "has_pending_changes",
            "head",
            "remote_names",
        ];
        self.calls()
            .into_iter()
            .filter(|call| !READS.iter().any(|read| call.starts_with(read)))
            .collect()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }
}

impl VersionStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    fn is_initialized(&self, path: &Path) -> bool {
        self.initialized.borrow().contains(path)
    }

    fn open(&self, path: &Path) -> SyncResult<RepositoryHandle> {
        self.record("open");
        if !self.is_initialized(path) {
            return Err(SyncError::NotARepository(path.to_path_buf()));
        }
        Ok(RepositoryHandle::new(path))
    }

    fn ensure_initialized(
        &self,
        path: &Path,
        options: InitOptions<'_>,
    ) -> SyncResult<RepositoryHandle> {
        if self.is_initialized(path) {
            return Ok(RepositoryHandle::new(path));
        }
        self.record("ensure_initialized");
        self.mark_initialized(path);
        *self.identity.borrow_mut() = Some(options.identity.clone());
        self.commits.borrow_mut().push("initial".into());
        Ok(RepositoryHandle::new(path))
    }

    fn has_pending_changes(&self, _repo: &RepositoryHandle) -> SyncResult<bool> {
        self.record("has_pending_changes");
        Ok(self.dirty.get() || self.staged.get())
    }

    fn stage_all(&self, _repo: &RepositoryHandle) -> SyncResult<()> {
        self.record("stage_all");
        if self.vanish_on_stage.get() {
            self.dirty.set(false);
        }
        if self.dirty.get() {
            self.staged.set(true);
            self.dirty.set(false);
        }
        Ok(())
    }

    fn commit(&self, _repo: &RepositoryHandle, message: &str) -> SyncResult<CommitId> {
        self.record("commit");
        if !self.staged.get() {
            return Err(SyncError::EmptyCommit);
        }
        self.staged.set(false);
        let mut commits = self.commits.borrow_mut();
        commits.push(message.to_string());
        Ok(CommitId::new(format!("c{:040}", commits.len())))
    }

    fn head(&self, _repo: &RepositoryHandle) -> SyncResult<Option<CommitId>> {
        self.record("head");
        let count = self.commits.borrow().len();
        Ok((count > 0).then(|| CommitId::new(format!("c{:040}", count))))
    }

    fn configure_identity(
        &self,
        _repo: &RepositoryHandle,
        identity: &OperatorIdentity,
    ) -> SyncResult<()> {
        self.record("configure_identity");
        *self.identity.borrow_mut() = Some(identity.clone());
        Ok(())
    }

    fn remote_names(&self, _repo: &RepositoryHandle) -> SyncResult<Vec<String>> {
        self.record("remote_names");
        Ok(self.remotes.borrow().keys().cloned().collect())
    }

    fn remove_remote(&self, _repo: &RepositoryHandle, name: &str) -> SyncResult<()> {
        self.record(format!("remove_remote {}", name));
        self.remotes
            .borrow_mut()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SyncError::RemoteConfigFailure(format!("no such remote '{}'", name)))
    }

    fn add_remote(&self, _repo: &RepositoryHandle, name: &str, url: &str) -> SyncResult<()> {
        self.record(format!("add_remote {} {}", name, url));
        if let Some(message) = self.add_remote_error.borrow().clone() {
            return Err(SyncError::RemoteConfigFailure(message));
        }
        let mut remotes = self.remotes.borrow_mut();
        if remotes.contains_key(name) {
            return Err(SyncError::RemoteConfigFailure(format!(
                "remote {} already exists",
                name
            )));
        }
        remotes.insert(
            name.to_string(),
            MemoryRemote {
                url: url.to_string(),
                options: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn set_remote_option(
        &self,
        _repo: &RepositoryHandle,
        name: &str,
        key: &str,
        value: &str,
    ) -> SyncResult<()> {
        self.record(format!("set_remote_option {} {}", name, key));
        let mut remotes = self.remotes.borrow_mut();
        let remote = remotes.entry(name.to_string()).or_default();
        remote.options.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remote_option(
        &self,
        _repo: &RepositoryHandle,
        name: &str,
        key: &str,
    ) -> SyncResult<Option<String>> {
        Ok(self
            .remotes
            .borrow()
            .get(name)
            .and_then(|remote| remote.options.get(key).cloned()))
    }

    fn push(&self, _repo: &RepositoryHandle, remote: &str, branch: &str) -> SyncResult<()> {
        self.record(format!("push {} {}", remote, branch));
        if let Some(message) = self.push_error.borrow().clone() {
            return Err(SyncError::transport("push", message));
        }
        self.pushes
            .borrow_mut()
            .push((remote.to_string(), branch.to_string()));
        Ok(())
    }

    fn pull(&self, _repo: &RepositoryHandle, remote: &str, branch: &str) -> SyncResult<()> {
        self.record(format!("pull {} {}", remote, branch));
        self.pulls
            .borrow_mut()
            .push((remote.to_string(), branch.to_string()));
        Ok(())
    }

    fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        remote: &str,
        _branch: &str,
        remote_options: &[(String, String)],
    ) -> SyncResult<RepositoryHandle> {
        self.record(format!("clone {} {}", url, dest.display()));
        if let Some(message) = self.clone_error.borrow().clone() {
            return Err(SyncError::transport("clone", message));
        }

        fs::create_dir_all(dest)?;
        for file in self.clone_files.borrow().iter() {
            let path = dest.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, "restored")?;
        }

        self.mark_initialized(dest);
        self.remotes.borrow_mut().insert(
            remote.to_string(),
            MemoryRemote {
                url: url.to_string(),
                options: remote_options.iter().cloned().collect(),
            },
        );
        Ok(RepositoryHandle::new(dest))
    }
}
