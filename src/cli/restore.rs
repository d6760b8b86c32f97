//! Restore CLI command
//!
//! `--target <path>` performs a first-time clone; `--pull-only` fast-forwards
//! the configured graph. Exactly one of the two is required.

use std::path::PathBuf;

use clap::{ArgGroup, Args};

use crate::backup::{
    Collaborators, ForceConfirmation, RestoreMode, RestoreOrchestrator, RestoreOutcome,
};
use crate::config::paths::SyncPaths;
use crate::config::settings::Settings;
use crate::error::SyncResult;
use crate::journal::{RunJournal, RunKind};
use crate::keys::GpgKeyAuthority;
use crate::store::GitStore;
use crate::transport::GcryptTransport;

use super::journal_failure;

/// Restore arguments
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["target", "pull_only"])
))]
pub struct RestoreArgs {
    /// Directory to clone the graph into
    #[arg(long, value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// Replace the contents of a non-empty target
    #[arg(short, long, requires = "target")]
    pub force: bool,

    /// Fast-forward the configured graph from the remote
    #[arg(long)]
    pub pull_only: bool,
}

impl RestoreArgs {
    pub fn mode(&self) -> RestoreMode {
        match &self.target {
            Some(target) => RestoreMode::Clone {
                target: target.clone(),
            },
            None => RestoreMode::PullOnly,
        }
    }
}

/// Handle the restore command
pub fn handle_restore_command(
    paths: &SyncPaths,
    settings: &Settings,
    args: RestoreArgs,
) -> SyncResult<()> {
    let mode = args.mode();
    let kind = match mode {
        RestoreMode::Clone { .. } => RunKind::Restore,
        RestoreMode::PullOnly => RunKind::Pull,
    };
    let journal = RunJournal::start(&paths.logs_dir(), kind)?;

    // a fresh machine has no graph path yet; the clone target stands in
    let mut settings = settings.clone();
    if settings.graph_path.is_none() {
        if let RestoreMode::Clone { target } = &mode {
            settings.graph_path = Some(target.clone());
        }
    }
    let context = journal_failure(&journal, settings.to_context(paths))?;

    let store = GitStore::new();
    let transport = GcryptTransport::new();
    let keys = GpgKeyAuthority::new();
    let collaborators = Collaborators::new(&store, &transport, &keys);
    let confirmation = ForceConfirmation::new(args.force);

    let report =
        RestoreOrchestrator::new(&context, collaborators, &confirmation, &journal).run(&mode)?;

    println!("{}", report.summary());
    if let RestoreOutcome::Cancelled { target } = &report.outcome {
        println!("To replace its contents, run again with --force:");
        println!("  cryptsync restore --target {} --force", target.display());
    }
    println!("Journal: {}", journal.path().display());

    Ok(())
}
