//! Backup and restore orchestration
//!
//! The two orchestrators are the only place with real decision logic: they
//! compose the version store, the remote binder, the change detector and the
//! key authority into single-shot, idempotent runs.
//!
//! # Architecture
//!
//! - `BackupOrchestrator`: one backup cycle (init, bind, detect, commit, push)
//! - `RestoreOrchestrator`: first-time clone or fast-forward pull
//! - `verify`: structural check of a restored graph
//!
//! Both take the per-repository run lock before touching anything and record
//! every state they pass through in the run's journal.
//!
//! # Example
//!
//! ```rust,ignore
//! use cryptsync::backup::{BackupOrchestrator, Collaborators};
//!
//! let collaborators = Collaborators::new(&store, &transport, &keys);
//! let report = BackupOrchestrator::new(&context, collaborators, &journal).run()?;
//! println!("{}", report.summary());
//! ```

mod orchestrator;
mod preflight;
mod restore;
#[cfg(test)]
pub(crate) mod testing;
pub mod verify;

use crate::keys::KeyAuthority;
use crate::store::VersionStore;
use crate::transport::EncryptionTransport;

pub use orchestrator::{BackupOrchestrator, BackupOutcome, BackupReport, BackupState, SkipReason};
pub use restore::{
    Confirmation, ForceConfirmation, RestoreMode, RestoreOrchestrator, RestoreOutcome,
    RestoreReport, RestoreState,
};
pub use verify::{verify_structure, VerificationReport};

/// External collaborators shared by both orchestrators
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub store: &'a dyn VersionStore,
    pub transport: &'a dyn EncryptionTransport,
    pub keys: &'a dyn KeyAuthority,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        store: &'a dyn VersionStore,
        transport: &'a dyn EncryptionTransport,
        keys: &'a dyn KeyAuthority,
    ) -> Self {
        Self {
            store,
            transport,
            keys,
        }
    }
}
