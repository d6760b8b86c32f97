//! Git implementation of the version store
//!
//! Every primitive is a single `git -C <root> ...` invocation, so each one is
//! as atomic as git itself makes it.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::{CommitId, InitOptions, RepositoryHandle, VersionStore};
use crate::config::OperatorIdentity;
use crate::error::{SyncError, SyncResult};
use crate::exec::{self, CommandOutput};

const INITIAL_COMMIT_MESSAGE: &str = "Initialize cryptsync repository";

/// Version store backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitStore {
    program: String,
}

impl Default for GitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GitStore {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific git executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn git(&self, root: &Path, args: &[&str]) -> SyncResult<CommandOutput> {
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 2);
        full.push("-C");
        let root_str = root.to_str().ok_or_else(|| {
            SyncError::StorageFailure(format!("Path is not valid UTF-8: {}", root.display()))
        })?;
        full.push(root_str);
        full.extend_from_slice(args);
        exec::run(&self.program, &full)
    }

    /// Run a git command and turn a non-zero exit into the given error
    fn git_checked(
        &self,
        root: &Path,
        args: &[&str],
        on_failure: impl FnOnce(String) -> SyncError,
    ) -> SyncResult<CommandOutput> {
        let output = self.git(root, args)?;
        if !output.success {
            return Err(on_failure(format!(
                "git {}: {}",
                args.join(" "),
                output.message()
            )));
        }
        Ok(output)
    }

    fn write_exclusions(&self, root: &Path, exclusions: &[String]) -> SyncResult<()> {
        let ignore_file = root.join(".gitignore");
        if ignore_file.exists() || exclusions.is_empty() {
            return Ok(());
        }

        let mut contents = exclusions.join("\n");
        contents.push('\n');
        fs::write(&ignore_file, contents).map_err(|e| {
            SyncError::StorageFailure(format!("Failed to write exclusion list: {}", e))
        })
    }
}

impl VersionStore for GitStore {
    fn is_available(&self) -> bool {
        Path::new(&self.program).is_file() || exec::find_program(&self.program).is_some()
    }

    fn is_initialized(&self, path: &Path) -> bool {
        path.join(".git").exists()
    }

    fn open(&self, path: &Path) -> SyncResult<RepositoryHandle> {
        if !path.is_dir() || !self.is_initialized(path) {
            return Err(SyncError::NotARepository(path.to_path_buf()));
        }
        Ok(RepositoryHandle::new(path))
    }

    fn ensure_initialized(
        &self,
        path: &Path,
        options: InitOptions<'_>,
    ) -> SyncResult<RepositoryHandle> {
        let repo = RepositoryHandle::new(path);

        if self.is_initialized(path) {
            if self.head(&repo)?.is_some() {
                debug!(path = %path.display(), "repository already initialized");
                return Ok(repo);
            }
            // metadata without a first commit: an earlier init was interrupted
            warn!(path = %path.display(), "resuming unfinished repository initialization");
        } else {
            fs::create_dir_all(path).map_err(|e| {
                SyncError::StorageFailure(format!(
                    "Failed to create {}: {}",
                    path.display(),
                    e
                ))
            })?;

            self.git_checked(path, &["init", "-q"], SyncError::StorageFailure)?;
        }

        let head_ref = format!("refs/heads/{}", options.branch);
        self.git_checked(
            path,
            &["symbolic-ref", "HEAD", &head_ref],
            SyncError::StorageFailure,
        )?;

        self.configure_identity(&repo, options.identity)?;
        self.git_checked(
            path,
            &["config", "core.fileMode", "true"],
            SyncError::StorageFailure,
        )?;

        self.write_exclusions(path, options.exclusions)?;

        self.git_checked(
            path,
            &["commit", "-q", "--allow-empty", "-m", INITIAL_COMMIT_MESSAGE],
            SyncError::StorageFailure,
        )?;

        info!(path = %path.display(), branch = options.branch, "initialized repository");
        Ok(repo)
    }

    fn has_pending_changes(&self, repo: &RepositoryHandle) -> SyncResult<bool> {
        let output = self.git_checked(
            repo.root(),
            &["status", "--porcelain", "--untracked-files=all"],
            SyncError::StorageFailure,
        )?;
        Ok(!output.stdout.trim().is_empty())
    }

    fn stage_all(&self, repo: &RepositoryHandle) -> SyncResult<()> {
        self.git_checked(repo.root(), &["add", "--all"], SyncError::StorageFailure)?;
        Ok(())
    }

    fn commit(&self, repo: &RepositoryHandle, message: &str) -> SyncResult<CommitId> {
        // exit 0: index matches HEAD, 1: staged changes present
        let staged = self.git(repo.root(), &["diff", "--cached", "--quiet"])?;
        match staged.code {
            Some(0) => return Err(SyncError::EmptyCommit),
            Some(1) => {}
            _ => {
                return Err(SyncError::StorageFailure(format!(
                    "git diff --cached: {}",
                    staged.message()
                )))
            }
        }

        self.git_checked(
            repo.root(),
            &["commit", "-q", "-m", message],
            SyncError::StorageFailure,
        )?;

        self.head(repo)?.ok_or_else(|| {
            SyncError::StorageFailure("HEAD missing after commit".into())
        })
    }

    fn head(&self, repo: &RepositoryHandle) -> SyncResult<Option<CommitId>> {
        let output = self.git(repo.root(), &["rev-parse", "--verify", "-q", "HEAD"])?;
        if !output.success {
            return Ok(None);
        }
        Ok(Some(CommitId::new(output.stdout.trim())))
    }

    fn configure_identity(
        &self,
        repo: &RepositoryHandle,
        identity: &OperatorIdentity,
    ) -> SyncResult<()> {
        self.git_checked(
            repo.root(),
            &["config", "user.name", &identity.name],
            SyncError::StorageFailure,
        )?;
        self.git_checked(
            repo.root(),
            &["config", "user.email", &identity.email],
            SyncError::StorageFailure,
        )?;
        Ok(())
    }

    fn remote_names(&self, repo: &RepositoryHandle) -> SyncResult<Vec<String>> {
        let output = self.git_checked(repo.root(), &["remote"], SyncError::RemoteConfigFailure)?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    fn remove_remote(&self, repo: &RepositoryHandle, name: &str) -> SyncResult<()> {
        self.git_checked(
            repo.root(),
            &["remote", "remove", name],
            SyncError::RemoteConfigFailure,
        )?;
        Ok(())
    }

    fn add_remote(&self, repo: &RepositoryHandle, name: &str, url: &str) -> SyncResult<()> {
        self.git_checked(
            repo.root(),
            &["remote", "add", name, url],
            SyncError::RemoteConfigFailure,
        )?;
        Ok(())
    }

    fn set_remote_option(
        &self,
        repo: &RepositoryHandle,
        name: &str,
        key: &str,
        value: &str,
    ) -> SyncResult<()> {
        let config_key = format!("remote.{}.{}", name, key);
        self.git_checked(
            repo.root(),
            &["config", "--replace-all", &config_key, value],
            SyncError::RemoteConfigFailure,
        )?;
        Ok(())
    }

    fn remote_option(
        &self,
        repo: &RepositoryHandle,
        name: &str,
        key: &str,
    ) -> SyncResult<Option<String>> {
        let config_key = format!("remote.{}.{}", name, key);
        let output = self.git(repo.root(), &["config", "--get", &config_key])?;
        match output.code {
            Some(0) => Ok(Some(output.stdout.trim().to_string())),
            Some(1) => Ok(None),
            _ => Err(SyncError::RemoteConfigFailure(format!(
                "git config --get {}: {}",
                config_key,
                output.message()
            ))),
        }
    }

    fn push(&self, repo: &RepositoryHandle, remote: &str, branch: &str) -> SyncResult<()> {
        self.git_checked(repo.root(), &["push", remote, branch], |message| {
            SyncError::transport("push", message)
        })?;
        Ok(())
    }

    fn pull(&self, repo: &RepositoryHandle, remote: &str, branch: &str) -> SyncResult<()> {
        self.git_checked(
            repo.root(),
            &["pull", "--ff-only", "-q", remote, branch],
            |message| SyncError::transport("pull", message),
        )?;
        Ok(())
    }

    fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        remote: &str,
        branch: &str,
        remote_options: &[(String, String)],
    ) -> SyncResult<RepositoryHandle> {
        let dest_str = dest.to_str().ok_or_else(|| {
            SyncError::StorageFailure(format!("Path is not valid UTF-8: {}", dest.display()))
        })?;

        let settings: Vec<String> = remote_options
            .iter()
            .map(|(key, value)| format!("remote.{}.{}={}", remote, key, value))
            .collect();

        let mut args: Vec<&str> = vec!["clone", "-q", "--origin", remote, "--branch", branch];
        for setting in &settings {
            args.push("-c");
            args.push(setting);
        }
        args.push(url);
        args.push(dest_str);

        let output = exec::run(&self.program, &args)?;
        if !output.success {
            return Err(SyncError::transport("clone", output.message()));
        }

        Ok(RepositoryHandle::new(dest))
    }
}
