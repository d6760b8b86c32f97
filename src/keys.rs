//! Key authority
//!
//! Resolves recipient identities to key material for pre-flight validation.
//! No cryptographic operation happens here; encryption is left entirely to the
//! transport.

use crate::error::{SyncError, SyncResult};
use crate::exec;

/// Key material a recipient identity resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle {
    /// Identity as configured
    pub identity: String,
    /// Primary key fingerprint
    pub fingerprint: String,
    /// First user id on the key, if any
    pub user_id: Option<String>,
}

pub trait KeyAuthority {
    /// Whether the key authority's tooling is installed
    fn is_available(&self) -> bool;

    /// True if `identity` resolves to a key that can encrypt
    fn has_usable_key(&self, identity: &str) -> bool;

    /// Resolve `identity`, failing with `KeyNotFound`
    fn resolve(&self, identity: &str) -> SyncResult<KeyHandle>;
}

/// One primary key from a `gpg --with-colons` listing
#[derive(Debug, Clone, PartialEq, Eq)]
struct GpgKey {
    validity: char,
    capabilities: String,
    fingerprint: Option<String>,
    user_id: Option<String>,
}

impl GpgKey {
    fn is_usable(&self) -> bool {
        !matches!(self.validity, 'i' | 'd' | 'r' | 'e')
            && self.capabilities.contains('E')
            && !self.capabilities.contains('D')
    }
}

/// Parse the primary keys out of `gpg --with-colons --list-keys` output
///
/// Only the first `fpr` and `uid` line after each `pub` record belong to the
/// primary key; subkey fingerprints are ignored.
fn parse_colon_listing(listing: &str) -> Vec<GpgKey> {
    let mut keys: Vec<GpgKey> = Vec::new();
    let mut in_subkey = false;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") => {
                in_subkey = false;
                keys.push(GpgKey {
                    validity: fields
                        .get(1)
                        .and_then(|v| v.chars().next())
                        .unwrap_or('-'),
                    capabilities: fields.get(11).copied().unwrap_or_default().to_string(),
                    fingerprint: None,
                    user_id: None,
                });
            }
            Some("sub") | Some("ssb") => in_subkey = true,
            Some("fpr") if !in_subkey => {
                if let Some(key) = keys.last_mut() {
                    if key.fingerprint.is_none() {
                        key.fingerprint = fields
                            .get(9)
                            .filter(|f| !f.is_empty())
                            .map(|f| f.to_string());
                    }
                }
            }
            Some("uid") => {
                if let Some(key) = keys.last_mut() {
                    if key.user_id.is_none() {
                        key.user_id = fields
                            .get(9)
                            .filter(|u| !u.is_empty())
                            .map(|u| u.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    keys
}

/// Key authority backed by the GnuPG public keyring
#[derive(Debug, Clone)]
pub struct GpgKeyAuthority {
    program: String,
}

impl Default for GpgKeyAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl GpgKeyAuthority {
    pub fn new() -> Self {
        Self {
            program: "gpg".to_string(),
        }
    }

    fn list_keys(&self, identity: &str) -> SyncResult<Vec<GpgKey>> {
        let args = ["--batch", "--with-colons", "--list-keys", identity];
        let output = exec::run(&self.program, args)?;
        if !output.success {
            // gpg exits non-zero when nothing matches
            return Ok(Vec::new());
        }
        Ok(parse_colon_listing(&output.stdout))
    }
}

impl KeyAuthority for GpgKeyAuthority {
    fn is_available(&self) -> bool {
        exec::find_program(&self.program).is_some()
    }

    fn has_usable_key(&self, identity: &str) -> bool {
        self.list_keys(identity)
            .map(|keys| keys.iter().any(GpgKey::is_usable))
            .unwrap_or(false)
    }

    fn resolve(&self, identity: &str) -> SyncResult<KeyHandle> {
        let keys = self.list_keys(identity)?;
        let key = keys
            .iter()
            .find(|key| key.is_usable())
            .or_else(|| keys.first())
            .ok_or_else(|| SyncError::KeyNotFound(identity.to_string()))?;

        let fingerprint = key.fingerprint.clone().ok_or_else(|| {
            SyncError::KeyNotFound(format!("{} (no fingerprint in keyring listing)", identity))
        })?;

        Ok(KeyHandle {
            identity: identity.to_string(),
            fingerprint,
            user_id: key.user_id.clone(),
        })
    }
}
