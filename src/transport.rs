//! Encryption transport
//!
//! The transport is opaque to the orchestrators: it is selected by a scheme
//! prefix on the remote locator and configured through one option on the
//! remote holding the authorized participants. The default implementation is
//! git-remote-gcrypt.

use crate::config::RecipientSet;
use crate::exec;

/// Transport that encrypts all repository content on the remote
pub trait EncryptionTransport {
    /// Whether the transport helper is installed
    fn is_available(&self) -> bool;

    /// Human-readable name used in diagnostics
    fn name(&self) -> &str;

    /// Locator routed through the transport; `locator` itself is not altered
    fn wrap_locator(&self, locator: &str) -> String;

    /// Remote option key holding the participant list
    fn participants_key(&self) -> &str;

    /// Remote options to set for `participants`
    fn remote_options(&self, participants: &RecipientSet) -> Vec<(String, String)> {
        vec![(self.participants_key().to_string(), participants.joined())]
    }
}

/// git-remote-gcrypt transport
#[derive(Debug, Clone)]
pub struct GcryptTransport {
    helper: String,
}

impl GcryptTransport {
    pub const SCHEME: &'static str = "gcrypt::";
    pub const PARTICIPANTS_KEY: &'static str = "gcrypt-participants";

    pub fn new() -> Self {
        Self {
            helper: "git-remote-gcrypt".to_string(),
        }
    }
}

impl Default for GcryptTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionTransport for GcryptTransport {
    fn is_available(&self) -> bool {
        exec::find_program(&self.helper).is_some()
    }

    fn name(&self) -> &str {
        &self.helper
    }

    fn wrap_locator(&self, locator: &str) -> String {
        if locator.starts_with(Self::SCHEME) {
            locator.to_string()
        } else {
            format!("{}{}", Self::SCHEME, locator)
        }
    }

    fn participants_key(&self) -> &str {
        Self::PARTICIPANTS_KEY
    }
}
