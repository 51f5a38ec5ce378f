//! Pipeline error taxonomy.
//!
//! Every failure carries the stage it came from so callers can tell client
//! mistakes (validation) from host problems (provision, activation) and
//! isolated certificate failures (tls).

use std::fmt;
use std::path::PathBuf;
use serde::Serialize;
use thiserror::Error;

use crate::activation::ActivationError;
use crate::domain::record::InvalidTransition;
use crate::domain::{StoreError, ValidationError};
use crate::provision::ProvisionError;
use crate::system::{IssuanceError, MaterialError};
use crate::vhost::RenderError;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validate,
    Provision,
    Render,
    Activate,
    Tls,
    Store,
    Lookup,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Provision => "provision",
            Stage::Render => "render",
            Stage::Activate => "activate",
            Stage::Tls => "tls",
            Stage::Store => "store",
            Stage::Lookup => "lookup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificate step failures. These never take down the HTTP site.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate issuance is disabled")]
    Disabled,

    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    #[error("certificate issuance timed out after {0}s")]
    Timeout(u64),

    #[error("issued certificate material is unusable: {0}")]
    InvalidMaterial(#[from] MaterialError),

    #[error("rendering TLS config failed: {0}")]
    Render(#[from] RenderError),

    #[error("activating TLS config failed: {0}")]
    Activation(#[from] ActivationError),

    #[error(transparent)]
    State(#[from] InvalidTransition),
}

/// Any failure surfaced by `DomainService`.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("config render failed: {0}")]
    Render(#[from] RenderError),

    #[error("activation failed: {0}")]
    Activation(#[from] ActivationError),

    #[error("TLS step failed: {0}")]
    Tls(#[from] TlsError),

    #[error("record store failed: {0}")]
    Store(#[from] StoreError),

    #[error("domain {0} not found")]
    NotFound(String),
}

impl PanelError {
    pub fn stage(&self) -> Stage {
        match self {
            PanelError::Validation(_) => Stage::Validate,
            PanelError::Provision(_) => Stage::Provision,
            PanelError::Render(_) => Stage::Render,
            PanelError::Activation(_) => Stage::Activate,
            PanelError::Tls(_) => Stage::Tls,
            PanelError::Store(_) => Stage::Store,
            PanelError::NotFound(_) => Stage::Lookup,
        }
    }
}

/// A failed `create_domain`, with any filesystem artifacts it left behind.
///
/// Newly provisioned document roots are kept on later-stage failures so that
/// content uploaded in the meantime is never destroyed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct CreateFailure {
    #[source]
    pub error: PanelError,
    pub leftover_root: Option<PathBuf>,
}

impl CreateFailure {
    pub fn stage(&self) -> Stage {
        self.error.stage()
    }
}

impl From<PanelError> for CreateFailure {
    fn from(error: PanelError) -> Self {
        Self {
            error,
            leftover_root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tags() {
        let err = PanelError::from(ValidationError::DuplicateDomain("example.com".into()));
        assert_eq!(err.stage(), Stage::Validate);
        assert_eq!(err.to_string(), "validation failed: domain example.com already exists");

        let err = PanelError::from(TlsError::Timeout(180));
        assert_eq!(err.stage(), Stage::Tls);
        assert_eq!(PanelError::NotFound("x.com".into()).stage(), Stage::Lookup);
    }

    #[test]
    fn test_create_failure_wraps_any_stage_error() {
        let failure: CreateFailure =
            PanelError::from(ActivationError::ReloadFailed("boom".into())).into();
        assert_eq!(failure.stage(), Stage::Activate);
        assert!(failure.leftover_root.is_none());
        assert_eq!(failure.to_string(), "activation failed: proxy reload failed: boom");
        assert_eq!(serde_json::to_string(&failure.stage()).unwrap(), "\"activate\"");
    }
}
