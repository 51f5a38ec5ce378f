//! Atomic config activation with rollback.
//!
//! # Activation sequence (under the process-wide reload gate)
//! ```text
//! copy live → backup (if live exists)
//! journal.begin
//! rename staged → live            (atomic, same filesystem)
//! proxy.check_config ── fail ──▶ restore backup / remove live → ConfigRejected
//! proxy.reload       ── fail ──▶ restore backup / remove live → reload → ReloadFailed
//! journal.finish, drop backup     (success)
//! ```
//!
//! # Deactivation sequence
//! ```text
//! remove live → reload (failure surfaced, removal kept)
//! ```

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;

use crate::activation::journal::{Journal, JournalEntry};
use crate::activation::ActivationError;
use crate::domain::DomainName;
use crate::observability::metrics;
use crate::system::{ControlError, ProxyControl};
use crate::vhost::StagedConfig;

/// Outcome of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activated {
    pub live_path: PathBuf,
    /// A previous live config was replaced.
    pub replaced: bool,
}

/// Outcome of a successful deactivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deactivated {
    pub live_path: PathBuf,
    /// False when there was no live config to remove.
    pub removed: bool,
}

#[derive(Debug, Clone, Copy)]
enum ProxyOp {
    Check,
    Reload,
}

impl ProxyOp {
    fn name(self) -> &'static str {
        match self {
            ProxyOp::Check => "config check",
            ProxyOp::Reload => "reload",
        }
    }
}

/// Swaps staged configs into the live set and drives proxy reloads.
pub struct Activator {
    proxy: Arc<dyn ProxyControl>,
    journal: Journal,
    backup_dir: PathBuf,
    timeout: Duration,
    /// One swap/reload/rollback sequence at a time, across all domains.
    reload_gate: Mutex<()>,
}

impl Activator {
    pub fn new(
        proxy: Arc<dyn ProxyControl>,
        journal: Journal,
        backup_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            proxy,
            journal,
            backup_dir: backup_dir.into(),
            timeout,
            reload_gate: Mutex::new(()),
        }
    }

    fn backup_path(&self, name: &DomainName) -> PathBuf {
        self.backup_dir.join(format!("{name}.conf.bak"))
    }

    /// Move `staged` onto `live_path` and reload the proxy. On any failure the
    /// previous live state is restored before the error is returned.
    pub async fn activate(
        &self,
        staged: StagedConfig,
        live_path: &Path,
    ) -> Result<Activated, ActivationError> {
        let _gate = self.reload_gate.lock().await;
        let name = staged.name.clone();

        let result = self.swap_in(&staged, live_path).await;
        if result.is_err() {
            discard(&staged.path).await;
        }
        let backup = result?;

        let outcome = match self.call(ProxyOp::Check, self.proxy.check_config()).await {
            Ok(()) => self.call(ProxyOp::Reload, self.proxy.reload()).await,
            Err(e) => {
                tracing::warn!(domain = %name, error = %e, "Proxy rejected new config, rolling back");
                self.rollback(&name, live_path, backup.as_deref(), false).await?;
                return Err(e);
            }
        };

        if let Err(e) = outcome {
            tracing::warn!(domain = %name, error = %e, "Proxy reload failed, rolling back");
            self.rollback(&name, live_path, backup.as_deref(), true).await?;
            return Err(e);
        }

        if let Err(e) = self.journal.finish(&name).await {
            tracing::warn!(domain = %name, error = %e, "Failed to clear activation journal");
        }
        if let Some(backup) = &backup {
            discard(backup).await;
        }

        tracing::info!(domain = %name, live = %live_path.display(), "Config activated");
        Ok(Activated {
            live_path: live_path.to_path_buf(),
            replaced: backup.is_some(),
        })
    }

    /// Back up the current live file, journal the swap, and rename the staged
    /// file into place. Returns the backup path if a live file existed.
    async fn swap_in(
        &self,
        staged: &StagedConfig,
        live_path: &Path,
    ) -> Result<Option<PathBuf>, ActivationError> {
        let name = &staged.name;
        if let Some(parent) = live_path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err(parent))?;
        }

        let had_live = fs::try_exists(live_path).await.map_err(io_err(live_path))?;
        let backup = if had_live {
            let backup = self.backup_path(name);
            fs::create_dir_all(&self.backup_dir)
                .await
                .map_err(io_err(&self.backup_dir))?;
            fs::copy(live_path, &backup).await.map_err(io_err(&backup))?;
            Some(backup)
        } else {
            None
        };

        let entry = JournalEntry::new(name.clone(), live_path.to_path_buf(), backup.clone());
        if let Err(e) = self.journal.begin(&entry).await {
            if let Some(b) = &backup {
                discard(b).await;
            }
            return Err(ActivationError::Io {
                path: live_path.to_path_buf(),
                source: e,
            });
        }

        if let Err(e) = fs::rename(&staged.path, live_path).await {
            if let Some(b) = &backup {
                discard(b).await;
            }
            let _ = self.journal.finish(name).await;
            return Err(ActivationError::Io {
                path: live_path.to_path_buf(),
                source: e,
            });
        }

        Ok(backup)
    }

    /// Put back whatever was live before the swap. With `reload`, tell the
    /// proxy to re-read the restored state; a failure there is logged since
    /// the files are already back to the last-known-good state.
    async fn rollback(
        &self,
        name: &DomainName,
        live_path: &Path,
        backup: Option<&Path>,
        reload: bool,
    ) -> Result<(), ActivationError> {
        metrics::record_rollback();

        let restored = match backup {
            Some(backup) => fs::rename(backup, live_path).await,
            None => match fs::remove_file(live_path).await {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(source) = restored {
            tracing::error!(domain = %name, error = %source, "Rollback failed; journal kept for recovery");
            return Err(ActivationError::RollbackFailed {
                path: live_path.to_path_buf(),
                source,
            });
        }

        if reload {
            if let Err(e) = self.call(ProxyOp::Reload, self.proxy.reload()).await {
                tracing::error!(domain = %name, error = %e, "Reload after rollback failed");
            }
        }

        if let Err(e) = self.journal.finish(name).await {
            tracing::warn!(domain = %name, error = %e, "Failed to clear activation journal");
        }
        tracing::info!(domain = %name, live = %live_path.display(), "Rolled back to previous config");
        Ok(())
    }

    /// Remove the live config and reload. The removal is not undone if the
    /// reload fails.
    pub async fn deactivate(&self, live_path: &Path) -> Result<Deactivated, ActivationError> {
        let _gate = self.reload_gate.lock().await;

        let removed = match fs::remove_file(live_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(source) => {
                return Err(ActivationError::Io {
                    path: live_path.to_path_buf(),
                    source,
                })
            }
        };

        if removed {
            self.call(ProxyOp::Reload, self.proxy.reload()).await?;
        }

        tracing::info!(live = %live_path.display(), removed, "Config deactivated");
        Ok(Deactivated {
            live_path: live_path.to_path_buf(),
            removed,
        })
    }

    /// Roll back every journaled activation left by a previous process.
    /// Returns the number of entries recovered.
    pub async fn recover(&self) -> Result<usize, ActivationError> {
        let _gate = self.reload_gate.lock().await;

        let pending = self.journal.pending().await.map_err(|source| ActivationError::Io {
            path: PathBuf::from("<journal>"),
            source,
        })?;
        if pending.is_empty() {
            return Ok(0);
        }

        for entry in &pending {
            let live = &entry.live_path;
            let result = match &entry.backup_path {
                Some(backup) if fs::try_exists(backup).await.unwrap_or(false) => {
                    fs::rename(backup, live).await
                }
                // Already restored before the crash.
                Some(_) => Ok(()),
                None => match fs::remove_file(live).await {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    other => other,
                },
            };
            if let Err(source) = result {
                return Err(ActivationError::RollbackFailed {
                    path: live.clone(),
                    source,
                });
            }
            tracing::warn!(domain = %entry.domain, live = %live.display(), "Recovered interrupted activation");
            if let Err(e) = self.journal.finish(&entry.domain).await {
                tracing::warn!(domain = %entry.domain, error = %e, "Failed to clear activation journal");
            }
        }

        self.call(ProxyOp::Reload, self.proxy.reload()).await?;
        Ok(pending.len())
    }

    /// Run one proxy call under the configured deadline.
    async fn call<F>(&self, op: ProxyOp, fut: F) -> Result<(), ActivationError>
    where
        F: Future<Output = Result<(), ControlError>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(ControlError::Unavailable(msg))) => Err(ActivationError::Unavailable(msg)),
            Ok(Err(ControlError::Failed(msg))) => Err(match op {
                ProxyOp::Check => ActivationError::ConfigRejected(msg),
                ProxyOp::Reload => ActivationError::ReloadFailed(msg),
            }),
            Err(_) => Err(ActivationError::Timeout {
                operation: op.name(),
                secs: self.timeout.as_secs(),
            }),
        };

        if let ProxyOp::Reload = op {
            metrics::record_reload(if result.is_ok() { "success" } else { "failure" });
        }
        result
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ActivationError {
    let path = path.to_path_buf();
    move |source| ActivationError::Io { path, source }
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary config");
        }
    }
}
