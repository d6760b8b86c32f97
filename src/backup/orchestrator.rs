//! Backup cycle state machine
//!
//! One call to [`BackupOrchestrator::run`] walks
//! `START → CHECKING_DEPENDENCIES → ENSURING_REPO → BINDING_REMOTE →
//! DETECTING_CHANGES → (COMMITTING → PUSHING | SKIPPING) → DONE`, or stops in
//! `FAILED` at the first fatal error.

use std::fmt;

use chrono::Utc;

use super::preflight::check_dependencies;
use super::Collaborators;
use crate::binder::RemoteBinder;
use crate::changes::ChangeDetector;
use crate::config::SyncContext;
use crate::error::SyncResult;
use crate::journal::LogSink;
use crate::lock::RunLock;
use crate::store::{CommitId, InitOptions};

/// States of a backup cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    Start,
    CheckingDependencies,
    EnsuringRepo,
    BindingRemote,
    DetectingChanges,
    Committing,
    Pushing,
    Skipping,
    Done,
    Failed,
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::CheckingDependencies => "CHECKING_DEPENDENCIES",
            Self::EnsuringRepo => "ENSURING_REPO",
            Self::BindingRemote => "BINDING_REMOTE",
            Self::DetectingChanges => "DETECTING_CHANGES",
            Self::Committing => "COMMITTING",
            Self::Pushing => "PUSHING",
            Self::Skipping => "SKIPPING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Why a cycle ended without pushing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The working tree was clean
    NoChanges,
    /// Changes seen during detection were gone by commit time
    ChangesVanished,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChanges => write!(f, "no changes"),
            Self::ChangesVanished => write!(f, "changes vanished before commit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Pushed { commit: CommitId },
    Skipped { reason: SkipReason },
}

/// Result of a successful backup cycle
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub outcome: BackupOutcome,
    /// Every state visited, in order, ending with `DONE`
    pub states: Vec<BackupState>,
}

impl BackupReport {
    pub fn pushed(&self) -> bool {
        matches!(self.outcome, BackupOutcome::Pushed { .. })
    }

    pub fn summary(&self) -> String {
        match &self.outcome {
            BackupOutcome::Pushed { commit } => format!("Backed up commit {}", commit.short()),
            BackupOutcome::Skipped { reason } => format!("Nothing to back up ({})", reason),
        }
    }
}

/// Runs one backup cycle for a context
pub struct BackupOrchestrator<'a> {
    context: &'a SyncContext,
    collaborators: Collaborators<'a>,
    journal: &'a dyn LogSink,
}

impl<'a> BackupOrchestrator<'a> {
    pub fn new(
        context: &'a SyncContext,
        collaborators: Collaborators<'a>,
        journal: &'a dyn LogSink,
    ) -> Self {
        Self {
            context,
            collaborators,
            journal,
        }
    }

    /// Run the cycle to completion
    ///
    /// Fatal errors are recorded at ERROR with the state they occurred in and
    /// then returned unchanged.
    pub fn run(&self) -> SyncResult<BackupReport> {
        let mut states = vec![BackupState::Start];
        self.journal.info(&format!(
            "backup of {} started",
            self.context.local_path.display()
        ));

        match self.drive(&mut states) {
            Ok(outcome) => {
                self.enter(&mut states, BackupState::Done);
                let report = BackupReport { outcome, states };
                self.journal.info(&report.summary());
                self.prune_journals();
                Ok(report)
            }
            Err(err) => {
                let failed_in = states.last().copied().unwrap_or(BackupState::Start);
                self.journal.error(&format!(
                    "{} in {} ({}): {}",
                    BackupState::Failed,
                    failed_in,
                    err.kind(),
                    err
                ));
                Err(err)
            }
        }
    }

    fn drive(&self, states: &mut Vec<BackupState>) -> SyncResult<BackupOutcome> {
        let ctx = self.context;
        let store = self.collaborators.store;
        let _lock = RunLock::acquire(&ctx.lock_dir, &ctx.local_path)?;

        self.enter(states, BackupState::CheckingDependencies);
        check_dependencies(&self.collaborators, &ctx.recipients, self.journal)?;

        self.enter(states, BackupState::EnsuringRepo);
        let repo = store.ensure_initialized(
            &ctx.local_path,
            InitOptions {
                identity: &ctx.identity,
                branch: &ctx.branch,
                exclusions: &ctx.exclusions,
            },
        )?;

        self.enter(states, BackupState::BindingRemote);
        let url = RemoteBinder::new(store, self.collaborators.transport).ensure(
            &repo,
            &ctx.remote_name,
            &ctx.remote_locator,
            &ctx.recipients,
        )?;
        self.journal.info(&format!(
            "remote {} bound to {} for {} recipient(s)",
            ctx.remote_name,
            url,
            ctx.recipients.len()
        ));

        self.enter(states, BackupState::DetectingChanges);
        if !ChangeDetector::new(store).is_dirty(&repo)? {
            self.enter(states, BackupState::Skipping);
            return Ok(BackupOutcome::Skipped {
                reason: SkipReason::NoChanges,
            });
        }

        self.enter(states, BackupState::Committing);
        store.stage_all(&repo)?;
        let message = format!("Backup {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        let commit = match store.commit(&repo, &message) {
            Ok(commit) => commit,
            Err(err) if err.is_recoverable() => {
                self.enter(states, BackupState::Skipping);
                return Ok(BackupOutcome::Skipped {
                    reason: SkipReason::ChangesVanished,
                });
            }
            Err(err) => return Err(err),
        };
        self.journal.info(&format!("committed {}", commit.short()));

        self.enter(states, BackupState::Pushing);
        store.push(&repo, &ctx.remote_name, &ctx.branch)?;
        self.journal.info(&format!(
            "pushed {} to {}/{}",
            commit.short(),
            ctx.remote_name,
            ctx.branch
        ));

        Ok(BackupOutcome::Pushed { commit })
    }

    fn enter(&self, states: &mut Vec<BackupState>, state: BackupState) {
        states.push(state);
        self.journal.info(&format!("state {}", state));
    }

    fn prune_journals(&self) {
        match self.journal.prune_older_than(self.context.log_max_age) {
            Ok(removed) if !removed.is_empty() => {
                self.journal
                    .info(&format!("removed {} expired journal(s)", removed.len()));
            }
            Ok(_) => {}
            Err(err) => {
                self.journal.warn(&format!("journal retention failed: {}", err));
            }
        }
    }
}
