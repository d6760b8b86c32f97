//! Status CLI command
//!
//! Read-only: never initializes, binds or locks anything.

use crate::config::paths::SyncPaths;
use crate::config::settings::Settings;
use crate::error::{SyncError, SyncResult};
use crate::journal::{latest_journal, read_journal, RunKind};
use crate::store::{GitStore, VersionStore};
use crate::transport::{EncryptionTransport, GcryptTransport};

/// Handle the status command
pub fn handle_status_command(paths: &SyncPaths, settings: &Settings) -> SyncResult<()> {
    let graph_path = settings
        .graph_path
        .as_ref()
        .ok_or_else(|| SyncError::Config("graph_path is not set".into()))?;

    let store = GitStore::new();
    let transport = GcryptTransport::new();

    println!("cryptsync Status");
    println!("================");
    println!("Graph: {}", graph_path.display());
    println!("Remote locator: {}", settings.remote_url.as_deref().unwrap_or("(not set)"));
    println!("Recipients: {}", settings.recipients.len());
    println!();

    if !store.is_available() {
        println!("Repository: unknown (git is not installed)");
    } else {
        match store.open(graph_path) {
            Ok(repo) => {
                match store.head(&repo)? {
                    Some(head) => println!("Repository: initialized, HEAD {}", head.short()),
                    None => println!("Repository: initialized, no commits"),
                }
                let pending = store.has_pending_changes(&repo)?;
                println!("Pending changes: {}", if pending { "Yes" } else { "No" });

                let remotes = store.remote_names(&repo)?;
                if remotes.is_empty() {
                    println!("Remotes: none");
                } else {
                    println!("Remotes:");
                    for name in &remotes {
                        let participants =
                            store.remote_option(&repo, name, transport.participants_key())?;
                        match participants {
                            Some(list) => println!("  {} (participants: {})", name, list),
                            None => println!("  {}", name),
                        }
                    }
                }
            }
            Err(SyncError::NotARepository(_)) => {
                println!("Repository: not initialized (the first backup creates it)");
            }
            Err(err) => return Err(err),
        }
    }

    println!();
    println!("Last runs:");
    for kind in RunKind::all() {
        match latest_journal(&paths.logs_dir(), kind)? {
            Some(journal) => {
                let last = read_journal(&journal.path)
                    .ok()
                    .and_then(|records| records.last().cloned());
                let detail = last
                    .map(|record| format!("{} {}", record.level, record.message))
                    .unwrap_or_else(|| "(empty journal)".to_string());
                println!(
                    "  {:<8} {}  {}",
                    kind,
                    journal.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    detail
                );
            }
            None => println!("  {:<8} never", kind),
        }
    }

    Ok(())
}
