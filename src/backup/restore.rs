//! Restore from the encrypted remote
//!
//! Clone mode brings a graph onto a fresh machine:
//! `CHECKING_DEPENDENCIES → PREPARING_TARGET → CLONING → CONFIGURING →
//! VERIFYING → DONE`. Pull-only mode fast-forwards an existing clone:
//! `CHECKING_DEPENDENCIES → PULLING → DONE`.
//!
//! A non-empty target is only replaced after the caller confirms, and the
//! new content is cloned beside it first so a failed clone leaves the old
//! tree as it was.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::preflight::check_dependencies;
use super::verify::{verify_structure, VerificationReport};
use super::Collaborators;
use crate::config::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::journal::LogSink;
use crate::lock::RunLock;
use crate::store::{CommitId, RepositoryHandle};

const STAGING_SUFFIX: &str = "cryptsync-restore";
const REPLACED_SUFFIX: &str = "cryptsync-replaced";

/// Decides whether existing content may be overwritten
pub trait Confirmation {
    fn confirm_overwrite(&self, target: &Path) -> bool;
}

/// Confirmation answered up front by a `--force` flag
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceConfirmation {
    pub force: bool,
}

impl ForceConfirmation {
    pub fn new(force: bool) -> Self {
        Self { force }
    }
}

impl Confirmation for ForceConfirmation {
    fn confirm_overwrite(&self, _target: &Path) -> bool {
        self.force
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreMode {
    /// First-time clone into `target`
    Clone { target: PathBuf },
    /// Fast-forward the repository at the context's local path
    PullOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    Start,
    CheckingDependencies,
    PreparingTarget,
    Cloning,
    Configuring,
    Verifying,
    Pulling,
    Done,
    Failed,
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::CheckingDependencies => "CHECKING_DEPENDENCIES",
            Self::PreparingTarget => "PREPARING_TARGET",
            Self::Cloning => "CLONING",
            Self::Configuring => "CONFIGURING",
            Self::Verifying => "VERIFYING",
            Self::Pulling => "PULLING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Cloned {
        target: PathBuf,
        verification: VerificationReport,
    },
    Pulled {
        head: Option<CommitId>,
    },
    /// The operator declined to overwrite a non-empty target
    Cancelled { target: PathBuf },
}

/// Result of a restore run that did not fail
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub outcome: RestoreOutcome,
    pub states: Vec<RestoreState>,
}

impl RestoreReport {
    pub fn summary(&self) -> String {
        match &self.outcome {
            RestoreOutcome::Cloned {
                target,
                verification,
            } => format!(
                "Restored into {} ({})",
                target.display(),
                verification.summary()
            ),
            RestoreOutcome::Pulled { head: Some(head) } => {
                format!("Pulled, now at {}", head.short())
            }
            RestoreOutcome::Pulled { head: None } => "Pulled, repository is empty".to_string(),
            RestoreOutcome::Cancelled { target } => format!(
                "Restore cancelled: {} is not empty and was left untouched",
                target.display()
            ),
        }
    }
}

/// Where a clone lands relative to the target
enum Placement {
    /// Target did not exist; the clone creates it
    Create,
    /// Target exists and is empty
    InPlace,
    /// Target has content; clone beside it, swap on success
    Replace { staging: PathBuf },
}

pub struct RestoreOrchestrator<'a> {
    context: &'a SyncContext,
    collaborators: Collaborators<'a>,
    confirmation: &'a dyn Confirmation,
    journal: &'a dyn LogSink,
}

impl<'a> RestoreOrchestrator<'a> {
    pub fn new(
        context: &'a SyncContext,
        collaborators: Collaborators<'a>,
        confirmation: &'a dyn Confirmation,
        journal: &'a dyn LogSink,
    ) -> Self {
        Self {
            context,
            collaborators,
            confirmation,
            journal,
        }
    }

    pub fn run(&self, mode: &RestoreMode) -> SyncResult<RestoreReport> {
        let mut states = vec![RestoreState::Start];

        let result = match mode {
            RestoreMode::Clone { target } => {
                self.journal
                    .info(&format!("restore into {} started", target.display()));
                self.clone_into(target, &mut states)
            }
            RestoreMode::PullOnly => {
                self.journal.info(&format!(
                    "pull into {} started",
                    self.context.local_path.display()
                ));
                self.pull(&mut states)
            }
        };

        match result {
            Ok(outcome) => {
                self.enter(&mut states, RestoreState::Done);
                let report = RestoreReport { outcome, states };
                self.journal.info(&report.summary());
                Ok(report)
            }
            Err(err) => {
                let failed_in = states.last().copied().unwrap_or(RestoreState::Start);
                self.journal.error(&format!(
                    "{} in {} ({}): {}",
                    RestoreState::Failed,
                    failed_in,
                    err.kind(),
                    err
                ));
                Err(err)
            }
        }
    }

    fn clone_into(
        &self,
        target: &Path,
        states: &mut Vec<RestoreState>,
    ) -> SyncResult<RestoreOutcome> {
        let ctx = self.context;
        let store = self.collaborators.store;
        let transport = self.collaborators.transport;
        let _lock = RunLock::acquire(&ctx.lock_dir, target)?;

        self.enter(states, RestoreState::CheckingDependencies);
        check_dependencies(&self.collaborators, &ctx.recipients, self.journal)?;
        if ctx.recipients.is_empty() {
            return Err(SyncError::MissingRecipients);
        }

        self.enter(states, RestoreState::PreparingTarget);
        let placement = match self.placement(target)? {
            Some(placement) => placement,
            None => {
                return Ok(RestoreOutcome::Cancelled {
                    target: target.to_path_buf(),
                })
            }
        };

        self.enter(states, RestoreState::Cloning);
        let url = transport.wrap_locator(&ctx.remote_locator);
        let options = transport.remote_options(&ctx.recipients);
        let dest = match &placement {
            Placement::Replace { staging } => staging.as_path(),
            Placement::Create | Placement::InPlace => target,
        };
        if let Err(err) =
            store.clone_repository(&url, dest, &ctx.remote_name, &ctx.branch, &options)
        {
            self.discard_failed_clone(&placement, target);
            return Err(err);
        }
        if let Placement::Replace { staging } = &placement {
            self.swap_into_place(staging, target)?;
        }
        self.journal
            .info(&format!("cloned {} into {}", url, target.display()));

        self.enter(states, RestoreState::Configuring);
        let repo = RepositoryHandle::new(target);
        store.configure_identity(&repo, &ctx.identity)?;
        for (key, value) in &options {
            store.set_remote_option(&repo, &ctx.remote_name, key, value)?;
        }

        self.enter(states, RestoreState::Verifying);
        let verification = verify_structure(target, &ctx.expected_markers);
        for missing in &verification.missing {
            self.journal.warn(&format!(
                "expected {} not found in restored graph",
                missing.display()
            ));
        }

        Ok(RestoreOutcome::Cloned {
            target: target.to_path_buf(),
            verification,
        })
    }

    fn pull(&self, states: &mut Vec<RestoreState>) -> SyncResult<RestoreOutcome> {
        let ctx = self.context;
        let store = self.collaborators.store;
        let _lock = RunLock::acquire(&ctx.lock_dir, &ctx.local_path)?;

        self.enter(states, RestoreState::CheckingDependencies);
        check_dependencies(&self.collaborators, &ctx.recipients, self.journal)?;

        self.enter(states, RestoreState::Pulling);
        let repo = store.open(&ctx.local_path)?;
        store.pull(&repo, &ctx.remote_name, &ctx.branch)?;
        let head = store.head(&repo)?;

        Ok(RestoreOutcome::Pulled { head })
    }

    /// Decide where to clone, or `None` when the operator declined
    fn placement(&self, target: &Path) -> SyncResult<Option<Placement>> {
        if !target.exists() {
            return Ok(Some(Placement::Create));
        }
        if !target.is_dir() {
            return Err(SyncError::StorageFailure(format!(
                "Restore target {} is not a directory",
                target.display()
            )));
        }
        if is_empty_dir(target)? {
            return Ok(Some(Placement::InPlace));
        }

        if !self.confirmation.confirm_overwrite(target) {
            self.journal.warn(&format!(
                "{} is not empty and overwrite was not confirmed",
                target.display()
            ));
            return Ok(None);
        }

        let staging = sibling(target, STAGING_SUFFIX)?;
        if staging.exists() {
            self.journal.warn(&format!(
                "removing leftover staging directory {}",
                staging.display()
            ));
            fs::remove_dir_all(&staging)?;
        }
        Ok(Some(Placement::Replace { staging }))
    }

    fn discard_failed_clone(&self, placement: &Placement, target: &Path) {
        let leftover = match placement {
            Placement::Create => target,
            Placement::Replace { staging } => staging.as_path(),
            Placement::InPlace => return,
        };
        if leftover.exists() {
            if let Err(err) = fs::remove_dir_all(leftover) {
                self.journal.warn(&format!(
                    "could not remove partial clone {}: {}",
                    leftover.display(),
                    err
                ));
            }
        }
    }

    /// Move the staged clone over `target`, restoring the old tree on failure
    fn swap_into_place(&self, staging: &Path, target: &Path) -> SyncResult<()> {
        let replaced = sibling(target, REPLACED_SUFFIX)?;
        if replaced.exists() {
            fs::remove_dir_all(&replaced)?;
        }

        fs::rename(target, &replaced).map_err(|e| {
            SyncError::StorageFailure(format!(
                "Failed to move {} aside: {}",
                target.display(),
                e
            ))
        })?;

        if let Err(e) = fs::rename(staging, target) {
            if let Err(rollback) = fs::rename(&replaced, target) {
                self.journal.error(&format!(
                    "previous content left at {}: {}",
                    replaced.display(),
                    rollback
                ));
            }
            if let Err(cleanup) = fs::remove_dir_all(staging) {
                self.journal.warn(&format!(
                    "failed to remove staging directory {}: {}",
                    staging.display(),
                    cleanup
                ));
            }
            return Err(SyncError::StorageFailure(format!(
                "Failed to move restored graph into {}: {}",
                target.display(),
                e
            )));
        }

        if let Err(e) = fs::remove_dir_all(&replaced) {
            self.journal.warn(&format!(
                "previous content kept at {}: {}",
                replaced.display(),
                e
            ));
        }
        Ok(())
    }

    fn enter(&self, states: &mut Vec<RestoreState>, state: RestoreState) {
        states.push(state);
        self.journal.info(&format!("state {}", state));
    }
}

fn is_empty_dir(path: &Path) -> SyncResult<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Hidden directory next to `target`, e.g. `.notes.cryptsync-restore`
fn sibling(target: &Path, suffix: &str) -> SyncResult<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        SyncError::StorageFailure(format!(
            "Restore target {} has no directory name",
            target.display()
        ))
    })?;
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{}.{}", name.to_string_lossy(), suffix)))
}
