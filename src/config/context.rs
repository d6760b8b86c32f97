//! Per-run configuration context
//!
//! A [`SyncContext`] is built once from validated settings and passed by
//! reference into every orchestrator call. Nothing re-reads configuration
//! mid-run.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name and e-mail recorded as the author of backup commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorIdentity {
    pub name: String,
    pub email: String,
}

impl OperatorIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for OperatorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Ordered set of recipient identities
///
/// Insertion order is preserved; blank entries and repeats are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientSet(Vec<String>);

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity, returning false if it was blank or already present
    pub fn insert(&mut self, identity: impl AsRef<str>) -> bool {
        let identity = identity.as_ref().trim();
        if identity.is_empty() || self.0.iter().any(|existing| existing == identity) {
            return false;
        }
        self.0.push(identity.to_string());
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Space-joined form used as the transport's participant value
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = RecipientSet::new();
        for identity in iter {
            set.insert(identity);
        }
        set
    }
}

/// Immutable bundle of everything one run needs to know
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Directory holding the note graph
    pub local_path: PathBuf,
    /// Remote locator, without the transport scheme prefix
    pub remote_locator: String,
    /// Recipients authorized to decrypt the remote
    pub recipients: RecipientSet,
    /// Name of the bound remote
    pub remote_name: String,
    /// Branch pushed and pulled
    pub branch: String,
    /// Author of backup commits
    pub identity: OperatorIdentity,
    /// Exclusion list written when a repository is first initialized
    pub exclusions: Vec<String>,
    /// Items restore verification expects at the top of the graph
    pub expected_markers: Vec<String>,
    /// Journal files older than this are pruned after a successful run
    pub log_max_age: Duration,
    /// Directory for repository lock markers
    pub lock_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_set_keeps_order_and_drops_repeats() {
        let set: RecipientSet = ["bob@example.org", "alice@example.org", "bob@example.org", " "]
            .into_iter()
            .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.joined(), "bob@example.org alice@example.org");
    }

    #[test]
    fn test_recipient_set_trims() {
        let mut set = RecipientSet::new();
        assert!(set.insert("  0xDEADBEEF "));
        assert!(!set.insert("0xDEADBEEF"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["0xDEADBEEF"]);
    }

    #[test]
    fn test_identity_display() {
        let identity = OperatorIdentity::new("cryptsync", "cryptsync@localhost");
        assert_eq!(identity.to_string(), "cryptsync <cryptsync@localhost>");
    }
}
