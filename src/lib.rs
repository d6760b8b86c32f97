//! cryptsync - Encrypted git backups for a local note graph
//!
//! This library provides the backup and restore engine behind the `cryptsync`
//! binary. A note graph is versioned with git and pushed through
//! git-remote-gcrypt, so nothing but ciphertext ever leaves the machine.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Paths, settings and the immutable per-run context
//! - `error`: Custom error types
//! - `store`: Version store contract and its git implementation
//! - `transport`: Encryption transport (git-remote-gcrypt)
//! - `keys`: Key authority (GnuPG)
//! - `binder`: Binds the encrypted remote with its participant set
//! - `changes`: Change detection
//! - `lock`: Per-repository run lock
//! - `journal`: Per-run operation journal
//! - `backup`: Backup and restore orchestration
//! - `cli`: Command handlers for the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use cryptsync::config::{paths::SyncPaths, settings::Settings};
//!
//! let paths = SyncPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let context = settings.to_context(&paths)?;
//! ```

pub mod backup;
pub mod binder;
pub mod changes;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod journal;
pub mod keys;
pub mod lock;
pub mod logging;
pub mod store;
pub mod transport;

pub use error::SyncError;
