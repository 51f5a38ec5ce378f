//! Domain lifecycle orchestration.
//!
//! # State machine (per domain)
//! ```text
//! ABSENT ──validate→provision→render→activate(ok)──▶ ACTIVE(tls=NONE)
//! ACTIVE(tls=NONE|FAILED) ──issue(ok)→render→activate(ok)──▶ ACTIVE(tls=ACTIVE)
//! ACTIVE(tls=NONE|FAILED) ──issue/render/activate(fail)──▶ ACTIVE(tls=FAILED)
//! ACTIVE(*) ──deactivate→remove record→purge files──▶ ABSENT
//! any failure before activate(ok) ──▶ ABSENT (no record, live set unchanged)
//! ```
//!
//! # Design Decisions
//! - Each public operation holds the per-domain lock for its whole run
//! - A record is written only after its config is live, and a record is
//!   removed as soon as its config is gone
//! - Newly provisioned roots survive later-stage failures and are reported
//!   back to the caller instead

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use serde::Serialize;

use crate::activation::{ActivationError, Activator, DomainLocks, Journal};
use crate::config::{PanelConfig, ValidationMethod};
use crate::domain::name::ensure_unique;
use crate::domain::{
    CertificatePaths, DomainName, DomainRecord, JsonRecordStore, RecordStore, StoreError, TlsState,
};
use crate::error::{CreateFailure, PanelError, TlsError};
use crate::observability::metrics;
use crate::provision::Provisioner;
use crate::system::{
    verify_material, CertbotClient, CertificateAuthority, CommandProxyControl, ProxyControl,
};
use crate::vhost::{certificate_paths_in, ConfigWriter, RenderError};

/// Certificate step settings.
#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub enabled: bool,
    pub method: ValidationMethod,
    pub timeout: Duration,
}

/// What startup reconciliation found and fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Interrupted activations rolled back from the journal.
    pub recovered_activations: usize,
    /// Leftover staged configs deleted.
    pub stale_staged_removed: usize,
    /// Records moved from PENDING to FAILED.
    pub interrupted_issuance: Vec<DomainName>,
    /// PENDING records whose live config already serves HTTPS, moved to ACTIVE.
    pub completed_issuance: Vec<DomainName>,
    /// Records whose live config file is missing.
    pub missing_configs: Vec<DomainName>,
    /// Managed live configs with no record, withdrawn from the proxy.
    pub orphaned_configs: Vec<DomainName>,
}

/// Entry point for every domain operation.
pub struct DomainService {
    store: Arc<dyn RecordStore>,
    provisioner: Provisioner,
    writer: ConfigWriter,
    activator: Activator,
    authority: Arc<dyn CertificateAuthority>,
    locks: DomainLocks,
    tls: TlsSettings,
    purge_on_delete: bool,
}

impl DomainService {
    /// Wire the pipeline from configuration and injected collaborators.
    pub fn new(
        config: &PanelConfig,
        store: Arc<dyn RecordStore>,
        proxy: Arc<dyn ProxyControl>,
        authority: Arc<dyn CertificateAuthority>,
    ) -> Self {
        let activator = Activator::new(
            proxy,
            Journal::new(&config.state.journal_dir),
            &config.vhost.backup_dir,
            Duration::from_secs(config.proxy.timeout_secs),
        );

        Self {
            store,
            provisioner: Provisioner::new(&config.sites),
            writer: ConfigWriter::new(&config.vhost),
            activator,
            authority,
            locks: DomainLocks::new(),
            tls: TlsSettings {
                enabled: config.certificates.enabled,
                method: config.certificates.method,
                timeout: Duration::from_secs(config.certificates.timeout_secs),
            },
            purge_on_delete: config.sites.purge_on_delete,
        }
    }

    /// Production wiring: JSON record file, nginx commands, certbot.
    pub fn from_config(config: &PanelConfig) -> Result<Self, StoreError> {
        let store = JsonRecordStore::open(config.state.records_path.clone())?;
        let proxy = CommandProxyControl::new(&config.proxy);
        let authority = CertbotClient::new(&config.certificates, config.vhost.www_alias);
        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(proxy),
            Arc::new(authority),
        ))
    }

    /// Domains with an operation currently holding or awaiting their lock.
    pub fn operations_in_flight(&self) -> usize {
        self.locks.in_flight()
    }

    /// Provision, render and activate a new site.
    pub async fn create_domain(&self, input: &str) -> Result<DomainRecord, CreateFailure> {
        let start = Instant::now();
        let mut leftover_root = None;

        let result = self.create_inner(input, &mut leftover_root).await;
        metrics::record_operation("create", outcome(&result), start);

        result.map_err(|error| {
            tracing::warn!(
                input = %input,
                stage = %error.stage(),
                error = %error,
                leftover_root = ?leftover_root,
                "Domain creation failed"
            );
            CreateFailure { error, leftover_root }
        })
    }

    async fn create_inner(
        &self,
        input: &str,
        leftover_root: &mut Option<PathBuf>,
    ) -> Result<DomainRecord, PanelError> {
        let name = DomainName::parse(input)?;
        let _guard = self.locks.lock(&name).await;

        let config_path = self.writer.live_path(&name);
        // An unmanaged vhost at our deterministic path counts as taken.
        ensure_unique(&name, |n| self.store.contains(n) || config_path.exists())?;

        let root = self.provisioner.provision(&name).await?;
        if root.newly_created {
            *leftover_root = Some(root.path.clone());
        }

        let staged = self.writer.stage(&name, &root.path, None).await?;
        self.activator.activate(staged, &config_path).await?;

        let record = DomainRecord::new(name.clone(), root.path, config_path.clone());
        if let Err(e) = self.store.insert(record.clone()).await {
            // The config must not stay live without its record.
            if let Err(undo) = self.activator.deactivate(&config_path).await {
                tracing::error!(domain = %name, error = %undo, "Failed to withdraw config after store error");
            }
            return Err(e.into());
        }

        metrics::record_domain_count(self.store.list().len());
        tracing::info!(
            domain = %name,
            root = %record.document_root.display(),
            config = %record.config_path.display(),
            "Domain created"
        );
        Ok(record)
    }

    /// Remove a site: config first, then reload, then (optionally) files.
    ///
    /// `purge` overrides the configured `purge_on_delete` default.
    pub async fn delete_domain(&self, input: &str, purge: Option<bool>) -> Result<(), PanelError> {
        let start = Instant::now();
        let result = self.delete_inner(input, purge.unwrap_or(self.purge_on_delete)).await;
        metrics::record_operation("delete", outcome(&result), start);
        if let Err(e) = &result {
            tracing::warn!(input = %input, stage = %e.stage(), error = %e, "Domain deletion failed");
        }
        result
    }

    async fn delete_inner(&self, input: &str, purge: bool) -> Result<(), PanelError> {
        let name = DomainName::parse(input)?;
        let _guard = self.locks.lock(&name).await;

        let record = self
            .store
            .get(&name)
            .ok_or_else(|| PanelError::NotFound(name.to_string()))?;

        let reload = match self.activator.deactivate(&record.config_path).await {
            Ok(_) => Ok(()),
            // Removal itself failed: nothing changed.
            Err(e @ ActivationError::Io { .. }) => return Err(e.into()),
            Err(e) => Err(e),
        };

        // The config is gone, so the record goes too.
        self.store.remove(&name).await?;
        metrics::record_domain_count(self.store.list().len());

        if let Err(e) = reload {
            tracing::warn!(domain = %name, "Keeping site files; proxy may still reference them");
            return Err(e.into());
        }

        if purge {
            if let Err(e) = self.provisioner.remove(&name).await {
                tracing::warn!(domain = %name, error = %e, "Site directory cleanup failed");
            }
        }

        tracing::info!(domain = %name, purge, "Domain deleted");
        Ok(())
    }

    /// Issue a certificate and switch the site to HTTPS. Any failure leaves
    /// the plain HTTP config serving and marks the record FAILED.
    pub async fn enable_tls(&self, input: &str) -> Result<DomainRecord, PanelError> {
        let start = Instant::now();
        let result = self.enable_tls_inner(input).await;
        metrics::record_operation("enable_tls", outcome(&result), start);
        if let Err(e) = &result {
            tracing::warn!(input = %input, stage = %e.stage(), error = %e, "Enabling TLS failed");
        }
        result
    }

    async fn enable_tls_inner(&self, input: &str) -> Result<DomainRecord, PanelError> {
        if !self.tls.enabled {
            return Err(TlsError::Disabled.into());
        }

        let name = DomainName::parse(input)?;
        let _guard = self.locks.lock(&name).await;

        let mut record = self
            .store
            .get(&name)
            .ok_or_else(|| PanelError::NotFound(name.to_string()))?;

        if record.tls_state == TlsState::Active {
            return Ok(record);
        }

        record
            .set_tls_state(TlsState::Pending)
            .map_err(TlsError::from)?;
        self.store.update(record.clone()).await?;

        match self.issue_and_activate(&record).await {
            Ok(certificate) => {
                metrics::record_issuance("success");
                record
                    .set_tls_state(TlsState::Active)
                    .map_err(TlsError::from)?;
                record.certificate = Some(certificate);
                if let Err(e) = self.store.update(record.clone()).await {
                    // Reconciliation reads the certificate back from the live config.
                    tracing::error!(
                        domain = %name,
                        error = %e,
                        "HTTPS config is live but the ACTIVE record could not be stored; record stays PENDING"
                    );
                    return Err(e.into());
                }
                tracing::info!(domain = %name, "TLS enabled");
                Ok(record)
            }
            Err(e) => {
                metrics::record_issuance("failure");
                record
                    .set_tls_state(TlsState::Failed)
                    .map_err(TlsError::from)?;
                if let Err(store_err) = self.store.update(record).await {
                    tracing::error!(domain = %name, error = %store_err, "Failed to record TLS failure");
                }
                Err(e.into())
            }
        }
    }

    async fn issue_and_activate(&self, record: &DomainRecord) -> Result<CertificatePaths, TlsError> {
        let issued = tokio::time::timeout(
            self.tls.timeout,
            self.authority
                .issue(&record.name, self.tls.method, &record.document_root),
        )
        .await
        .map_err(|_| TlsError::Timeout(self.tls.timeout.as_secs()))??;

        verify_material(&issued)?;

        let staged = self
            .writer
            .stage(&record.name, &record.document_root, Some(&issued))
            .await?;
        self.activator.activate(staged, &record.config_path).await?;
        Ok(issued)
    }

    /// All domain records, ordered by name.
    pub fn list_domains(&self) -> Vec<DomainRecord> {
        self.store.list()
    }

    pub fn get_domain(&self, input: &str) -> Result<DomainRecord, PanelError> {
        let name = DomainName::parse(input)?;
        self.store
            .get(&name)
            .ok_or_else(|| PanelError::NotFound(name.to_string()))
    }

    /// Bring disk and records back to a consistent state after a restart.
    /// Must run before the service accepts requests.
    pub async fn reconcile(&self) -> Result<ReconcileReport, PanelError> {
        let mut report = ReconcileReport {
            recovered_activations: self.activator.recover().await?,
            ..ReconcileReport::default()
        };

        report.stale_staged_removed =
            self.writer
                .clear_staging()
                .await
                .map_err(|source| RenderError::WriteFailure {
                    path: self.writer.staging_dir().to_path_buf(),
                    source,
                })?;

        report.orphaned_configs = self.withdraw_orphans().await?;

        for mut record in self.store.list() {
            if record.tls_state == TlsState::Pending {
                match self.live_certificate(&record).await {
                    Some(certificate) => {
                        record
                            .set_tls_state(TlsState::Active)
                            .map_err(TlsError::from)?;
                        record.certificate = Some(certificate);
                        tracing::warn!(domain = %record.name, "HTTPS config was live for PENDING record; marked ACTIVE");
                        report.completed_issuance.push(record.name.clone());
                    }
                    None => {
                        record
                            .set_tls_state(TlsState::Failed)
                            .map_err(TlsError::from)?;
                        tracing::warn!(domain = %record.name, "Certificate issuance was interrupted; marked FAILED");
                        report.interrupted_issuance.push(record.name.clone());
                    }
                }
                self.store.update(record.clone()).await?;
            }
            if !record.config_path.exists() {
                tracing::warn!(
                    domain = %record.name,
                    config = %record.config_path.display(),
                    "Live config missing for domain record"
                );
                report.missing_configs.push(record.name);
            }
        }

        metrics::record_domain_count(self.store.list().len());
        tracing::info!(
            recovered = report.recovered_activations,
            staged_removed = report.stale_staged_removed,
            interrupted = report.interrupted_issuance.len(),
            completed = report.completed_issuance.len(),
            missing = report.missing_configs.len(),
            orphaned = report.orphaned_configs.len(),
            "Reconciliation complete"
        );
        Ok(report)
    }

    /// Certificate the live config already terminates TLS with, provided
    /// its material is still usable.
    async fn live_certificate(&self, record: &DomainRecord) -> Option<CertificatePaths> {
        let text = tokio::fs::read_to_string(&record.config_path).await.ok()?;
        let certificate = certificate_paths_in(&text)?;
        verify_material(&certificate).ok()?;
        Some(certificate)
    }

    /// Remove managed live configs that lost their record, e.g. after a crash
    /// between activation and the record write.
    async fn withdraw_orphans(&self) -> Result<Vec<DomainName>, PanelError> {
        let managed = self
            .writer
            .managed_live_configs()
            .await
            .map_err(|source| ActivationError::Io {
                path: self.writer.live_dir().to_path_buf(),
                source,
            })?;

        let mut withdrawn = Vec::new();
        for (name, path) in managed {
            if self.store.contains(&name) {
                continue;
            }
            tracing::warn!(domain = %name, config = %path.display(), "Withdrawing live config with no record");
            match self.activator.deactivate(&path).await {
                Ok(_) => {}
                Err(e @ ActivationError::Io { .. }) => return Err(e.into()),
                // The file is gone; the proxy drops it on its next reload.
                Err(e) => {
                    tracing::error!(domain = %name, error = %e, "Reload after withdrawing orphaned config failed");
                }
            }
            withdrawn.push(name);
        }
        Ok(withdrawn)
    }
}

fn outcome<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "failure"
    }
}
