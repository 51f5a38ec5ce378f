//! Staged config writing.
//!
//! # Responsibilities
//! - Map a domain to its live and staging config paths
//! - Render and write configs to the staging path only
//! - Clean up stale staged files
//! - Find live configs this panel wrote
//!
//! # Design Decisions
//! - Nothing in this module ever writes to the live directory; the
//!   activator owns the swap

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::VhostConfig;
use crate::domain::{CertificatePaths, DomainName};
use crate::vhost::template::{VhostTemplate, MANAGED_MARKER};
use crate::vhost::RenderError;

/// File extension of live configs.
pub const LIVE_EXTENSION: &str = "conf";

/// File extension of staged configs.
pub const STAGED_EXTENSION: &str = "staged";

/// A rendered config waiting for activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedConfig {
    pub name: DomainName,
    pub path: PathBuf,
}

/// Renders configs into the staging directory.
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    template: VhostTemplate,
    live_dir: PathBuf,
    staging_dir: PathBuf,
}

impl ConfigWriter {
    pub fn new(config: &VhostConfig) -> Self {
        Self {
            template: VhostTemplate::new(config),
            live_dir: config.live_dir.clone(),
            staging_dir: config.staging_dir.clone(),
        }
    }

    /// `<live_dir>/<name>.conf`
    pub fn live_path(&self, name: &DomainName) -> PathBuf {
        self.live_dir.join(format!("{name}.{LIVE_EXTENSION}"))
    }

    /// `<staging_dir>/<name>.conf.staged`
    pub fn staging_path(&self, name: &DomainName) -> PathBuf {
        self.staging_dir
            .join(format!("{name}.{LIVE_EXTENSION}.{STAGED_EXTENSION}"))
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn live_dir(&self) -> &Path {
        &self.live_dir
    }

    /// Render the config for `name` and write it to its staging path.
    pub async fn stage(
        &self,
        name: &DomainName,
        root: &Path,
        tls: Option<&CertificatePaths>,
    ) -> Result<StagedConfig, RenderError> {
        let text = self.template.render(name, root, tls)?;
        let path = self.staging_path(name);

        fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|source| RenderError::WriteFailure {
                path: self.staging_dir.clone(),
                source,
            })?;
        fs::write(&path, text.as_bytes())
            .await
            .map_err(|source| RenderError::WriteFailure {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(domain = %name, path = %path.display(), tls = tls.is_some(), "Staged vhost config");
        Ok(StagedConfig {
            name: name.clone(),
            path,
        })
    }

    /// Live configs carrying the managed marker, keyed by the domain their
    /// file name maps to. Unmanaged files and unparsable names are skipped.
    pub async fn managed_live_configs(&self) -> io::Result<Vec<(DomainName, PathBuf)>> {
        let mut entries = match fs::read_dir(&self.live_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LIVE_EXTENSION) {
                continue;
            }
            let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| DomainName::parse(s).ok())
            else {
                continue;
            };
            let text = match fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => continue,
                Err(e) => return Err(e),
            };
            if text.starts_with(MANAGED_MARKER) {
                found.push((name, path));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Delete every leftover staged file. Returns how many were removed.
    pub async fn clear_staging(&self) -> io::Result<usize> {
        let mut entries = match fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(STAGED_EXTENSION) {
                fs::remove_file(&path).await?;
                tracing::info!(path = %path.display(), "Removed stale staged config");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer(base: &Path) -> ConfigWriter {
        ConfigWriter::new(&VhostConfig {
            live_dir: base.join("sites-enabled"),
            staging_dir: base.join("staging"),
            backup_dir: base.join("backup"),
            ..VhostConfig::default()
        })
    }

    #[tokio::test]
    async fn test_stage_never_touches_live_path() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path());
        let name = DomainName::parse("example.com").unwrap();

        let staged = w.stage(&name, Path::new("/srv/example.com/public_html"), None).await.unwrap();

        assert_eq!(staged.path, dir.path().join("staging/example.com.conf.staged"));
        assert!(staged.path.exists());
        assert!(!w.live_path(&name).exists());
        assert_eq!(w.live_path(&name), dir.path().join("sites-enabled/example.com.conf"));
    }

    #[tokio::test]
    async fn test_render_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path());
        let name = DomainName::parse("example.com").unwrap();

        let err = w.stage(&name, Path::new("/srv/x;y"), None).await.unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        assert!(!w.staging_path(&name).exists());
    }

    #[tokio::test]
    async fn test_managed_live_configs_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path());
        assert!(w.managed_live_configs().await.unwrap().is_empty());

        let live = dir.path().join("sites-enabled");
        std::fs::create_dir_all(&live).unwrap();
        let name = DomainName::parse("example.com").unwrap();
        let staged = w.stage(&name, Path::new("/srv/example.com/public_html"), None).await.unwrap();
        std::fs::rename(&staged.path, w.live_path(&name)).unwrap();
        std::fs::write(live.join("default.conf"), "server { listen 80 default_server; }\n").unwrap();
        std::fs::write(live.join("notes.txt"), "# Managed by hostpanel\n").unwrap();

        let found = w.managed_live_configs().await.unwrap();
        assert_eq!(found, vec![(name.clone(), w.live_path(&name))]);
    }

    #[tokio::test]
    async fn test_clear_staging() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path());
        assert_eq!(w.clear_staging().await.unwrap(), 0);

        for host in ["a.com", "b.com"] {
            let name = DomainName::parse(host).unwrap();
            w.stage(&name, Path::new("/srv/site/public_html"), None).await.unwrap();
        }
        std::fs::write(dir.path().join("staging/README"), "keep").unwrap();

        assert_eq!(w.clear_staging().await.unwrap(), 2);
        assert!(dir.path().join("staging/README").exists());
    }
}
