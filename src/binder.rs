//! Encrypted remote binder
//!
//! Guarantees that a named remote points at the transport-wrapped locator and
//! carries exactly the configured participant set. Binding always drops the
//! existing remote first: a half-written or stale configuration is replaced,
//! never merged.

use tracing::debug;

use crate::config::RecipientSet;
use crate::error::{SyncError, SyncResult};
use crate::store::{RepositoryHandle, VersionStore};
use crate::transport::EncryptionTransport;

/// Binds remotes through an encryption transport
pub struct RemoteBinder<'a> {
    store: &'a dyn VersionStore,
    transport: &'a dyn EncryptionTransport,
}

impl<'a> RemoteBinder<'a> {
    pub fn new(store: &'a dyn VersionStore, transport: &'a dyn EncryptionTransport) -> Self {
        Self { store, transport }
    }

    /// Bind `name` to `locator` for `participants`
    ///
    /// Safe to call on every run. An empty participant set fails with
    /// [`SyncError::MissingRecipients`] before the repository is touched.
    pub fn ensure(
        &self,
        repo: &RepositoryHandle,
        name: &str,
        locator: &str,
        participants: &RecipientSet,
    ) -> SyncResult<String> {
        if participants.is_empty() {
            return Err(SyncError::MissingRecipients);
        }

        self.rebind(repo, name, locator, participants)
            .map_err(|err| match err {
                SyncError::RemoteConfigFailure(_) | SyncError::DependencyMissing(_) => err,
                other => SyncError::RemoteConfigFailure(other.to_string()),
            })
    }

    fn rebind(
        &self,
        repo: &RepositoryHandle,
        name: &str,
        locator: &str,
        participants: &RecipientSet,
    ) -> SyncResult<String> {
        if self.store.remote_names(repo)?.iter().any(|remote| remote == name) {
            debug!(remote = name, "dropping existing remote binding");
            self.store.remove_remote(repo, name)?;
        }

        let url = self.transport.wrap_locator(locator);
        self.store.add_remote(repo, name, &url)?;

        for (key, value) in self.transport.remote_options(participants) {
            self.store.set_remote_option(repo, name, &key, &value)?;
        }

        debug!(remote = name, %url, participants = participants.len(), "remote bound");
        Ok(url)
    }
}
