//! Pre-flight checks run before any mutating operation.

use super::Collaborators;
use crate::config::RecipientSet;
use crate::error::{SyncError, SyncResult};
use crate::journal::LogSink;
use crate::keys::KeyHandle;

/// Verify tooling and recipient keys, returning the resolved keys
pub(crate) fn check_dependencies(
    collaborators: &Collaborators<'_>,
    recipients: &RecipientSet,
    journal: &dyn LogSink,
) -> SyncResult<Vec<KeyHandle>> {
    if !collaborators.store.is_available() {
        return Err(SyncError::DependencyMissing(
            "version store tooling (git) is not installed".into(),
        ));
    }

    if !collaborators.transport.is_available() {
        return Err(SyncError::DependencyMissing(format!(
            "encryption transport {} is not installed",
            collaborators.transport.name()
        )));
    }

    if !collaborators.keys.is_available() {
        return Err(SyncError::DependencyMissing(
            "key authority tooling (gpg) is not installed".into(),
        ));
    }

    let mut keys = Vec::with_capacity(recipients.len());
    for identity in recipients.iter() {
        if !collaborators.keys.has_usable_key(identity) {
            return Err(SyncError::KeyNotFound(format!(
                "{} has no usable encryption key",
                identity
            )));
        }

        let key = collaborators.keys.resolve(identity)?;
        journal.info(&format!("recipient {} resolved to {}", identity, key.fingerprint));
        keys.push(key);
    }

    Ok(keys)
}
