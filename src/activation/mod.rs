//! Activation subsystem.
//!
//! # Data Flow
//! ```text
//! StagedConfig
//!     → locks.rs (caller holds the per-domain lock)
//!     → activator.rs (reload gate, backup, journal, atomic rename, reload)
//!     → journal.rs (write-ahead marker; replayed at startup)
//! ```
//!
//! # Design Decisions
//! - Staged, backup and live files share a filesystem, so swaps and
//!   restores are single renames
//! - Reloads are serialized process-wide; the proxy has one reload mechanism
//! - Every proxy call is bounded by a timeout, and a timeout takes the same
//!   rollback path as an explicit failure

pub mod activator;
pub mod journal;
pub mod locks;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use activator::{Activated, Activator, Deactivated};
pub use journal::{Journal, JournalEntry};
pub use locks::{DomainGuard, DomainLocks};

/// Errors from swapping configs and controlling the proxy.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// The syntax check refused the swapped-in config.
    #[error("proxy rejected the new configuration: {0}")]
    ConfigRejected(String),

    #[error("proxy reload failed: {0}")]
    ReloadFailed(String),

    #[error("proxy {operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// The control command could not run (missing binary, no privileges).
    #[error("proxy control unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Restoring the previous config failed; the journal entry is kept so
    /// startup recovery can retry.
    #[error("rollback of {path} failed: {source}")]
    RollbackFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
