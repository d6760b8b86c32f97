//! Change detection
//!
//! A repository is dirty when any file under the tracked root was added,
//! deleted, modified or had its permission mode changed, ignoring paths
//! matched by the exclusion list. Staged-but-uncommitted changes count too.
//! The result gates staging, committing and pushing.

use crate::error::SyncResult;
use crate::store::{RepositoryHandle, VersionStore};

pub struct ChangeDetector<'a> {
    store: &'a dyn VersionStore,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(store: &'a dyn VersionStore) -> Self {
        Self { store }
    }

    /// Whether there is anything worth committing
    pub fn is_dirty(&self, repo: &RepositoryHandle) -> SyncResult<bool> {
        self.store.has_pending_changes(repo)
    }
}
