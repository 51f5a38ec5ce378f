//! Virtual-host configuration subsystem.
//!
//! # Data Flow
//! ```text
//! DomainName + DocumentRoot (+ CertificatePaths)
//!     → template.rs (fixed nginx template, injection guard)
//!     → writer.rs (write to <staging_dir>/<name>.conf.staged)
//!     → StagedConfig → handed to the activator
//! ```

pub mod template;
pub mod writer;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use template::{certificate_paths_in, VhostTemplate, MANAGED_MARKER};
pub use writer::{ConfigWriter, StagedConfig};

/// Errors from config generation.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A substituted value could break out of the config syntax.
    #[error("template error: {0}")]
    Template(String),

    #[error("failed to write staged config {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
