//! Backup CLI command
//!
//! Runs one backup cycle with the git store, the gcrypt transport and the
//! GnuPG keyring. Meant to be invoked by hand or by an external scheduler.

use crate::backup::{BackupOrchestrator, Collaborators};
use crate::config::paths::SyncPaths;
use crate::config::settings::Settings;
use crate::error::SyncResult;
use crate::journal::{RunJournal, RunKind};
use crate::keys::GpgKeyAuthority;
use crate::store::GitStore;
use crate::transport::GcryptTransport;

use super::journal_failure;

/// Handle the backup command
pub fn handle_backup_command(paths: &SyncPaths, settings: &Settings) -> SyncResult<()> {
    let journal = RunJournal::start(&paths.logs_dir(), RunKind::Backup)?;
    let context = journal_failure(&journal, settings.to_context(paths))?;

    let store = GitStore::new();
    let transport = GcryptTransport::new();
    let keys = GpgKeyAuthority::new();
    let collaborators = Collaborators::new(&store, &transport, &keys);

    let report = BackupOrchestrator::new(&context, collaborators, &journal).run()?;

    println!("{}", report.summary());
    println!("Journal: {}", journal.path().display());

    Ok(())
}
