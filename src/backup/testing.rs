//! Stubs shared by the orchestrator tests.

use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use crate::config::{OperatorIdentity, RecipientSet, SyncContext};
use crate::error::{SyncError, SyncResult};
use crate::keys::{KeyAuthority, KeyHandle};
use crate::transport::EncryptionTransport;

pub struct StubTransport {
    pub available: Cell<bool>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            available: Cell::new(true),
        }
    }
}

impl EncryptionTransport for StubTransport {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    fn name(&self) -> &str {
        "stub-gcrypt"
    }

    fn wrap_locator(&self, locator: &str) -> String {
        format!("gcrypt::{}", locator)
    }

    fn participants_key(&self) -> &str {
        "gcrypt-participants"
    }
}

/// Passes locators through unchanged so a plain bare repository can stand in
pub struct PlainTransport;

impl EncryptionTransport for PlainTransport {
    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "plain"
    }

    fn wrap_locator(&self, locator: &str) -> String {
        locator.to_string()
    }

    fn participants_key(&self) -> &str {
        "gcrypt-participants"
    }
}

pub struct StubKeys {
    pub usable: Vec<String>,
}

impl StubKeys {
    pub fn with(usable: &[&str]) -> Self {
        Self {
            usable: usable.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl KeyAuthority for StubKeys {
    fn is_available(&self) -> bool {
        true
    }

    fn has_usable_key(&self, identity: &str) -> bool {
        self.usable.iter().any(|id| id == identity)
    }

    fn resolve(&self, identity: &str) -> SyncResult<KeyHandle> {
        if !self.has_usable_key(identity) {
            return Err(SyncError::KeyNotFound(identity.to_string()));
        }
        Ok(KeyHandle {
            identity: identity.to_string(),
            fingerprint: format!("FPR-{}", identity),
            user_id: None,
        })
    }
}

pub fn context(root: &Path, recipients: &[&str]) -> SyncContext {
    SyncContext {
        local_path: root.join("graph"),
        remote_locator: "git@example.org:me/notes.git".into(),
        recipients: recipients.iter().collect::<RecipientSet>(),
        remote_name: "backup".into(),
        branch: "main".into(),
        identity: OperatorIdentity::new("cryptsync", "cryptsync@localhost"),
        exclusions: vec!["logseq/bak/".into()],
        expected_markers: vec!["pages".into(), "journals".into()],
        log_max_age: Duration::from_secs(7 * 86_400),
        lock_dir: root.join("locks"),
    }
}
