//! Domain record and TLS lifecycle state.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::name::DomainName;

/// Certificate issuance state for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TlsState {
    #[default]
    None,
    Pending,
    Active,
    Failed,
}

/// Rejected TLS state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal TLS transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: TlsState,
    pub to: TlsState,
}

impl TlsState {
    /// Whether `self -> next` is an allowed transition.
    ///
    /// ```text
    /// NONE -> PENDING -> ACTIVE
    ///                 -> FAILED -> PENDING
    /// ```
    pub fn can_transition_to(self, next: TlsState) -> bool {
        matches!(
            (self, next),
            (TlsState::None, TlsState::Pending)
                | (TlsState::Failed, TlsState::Pending)
                | (TlsState::Pending, TlsState::Active)
                | (TlsState::Pending, TlsState::Failed)
        )
    }

    pub fn transition(self, next: TlsState) -> Result<TlsState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }
}

/// Paths of an issued certificate chain and its private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// One hosted site.
///
/// A record only exists while its virtual-host config is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub name: DomainName,
    pub document_root: PathBuf,
    pub config_path: PathBuf,
    pub tls_state: TlsState,
    /// Present once `tls_state` has reached `ACTIVE`.
    #[serde(default)]
    pub certificate: Option<CertificatePaths>,
    /// Seconds since the UNIX epoch.
    pub created_at: u64,
}

impl DomainRecord {
    pub fn new(name: DomainName, document_root: PathBuf, config_path: PathBuf) -> Self {
        Self {
            name,
            document_root,
            config_path,
            tls_state: TlsState::None,
            certificate: None,
            created_at: unix_now(),
        }
    }

    /// Move to `next`, enforcing the TLS state machine.
    pub fn set_tls_state(&mut self, next: TlsState) -> Result<(), InvalidTransition> {
        self.tls_state = self.tls_state.transition(next)?;
        Ok(())
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
