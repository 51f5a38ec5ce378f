//! Site filesystem provisioning.
//!
//! # Responsibilities
//! - Derive the document root from the configured base directory and a
//!   validated name (never from caller-supplied paths)
//! - Create the directory tree idempotently
//! - Seed a landing page into roots it created, never into existing ones
//! - Best-effort removal of a site tree after deletion
//!
//! # Design Decisions
//! - A symlink at the site path is treated as a collision, not followed
//! - Filesystem only; no network calls

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::config::SitesConfig;
use crate::domain::DomainName;

/// Landing page file written into new document roots.
pub const INDEX_FILE: &str = "index.html";

/// Errors from the provisioning stage.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("permission denied creating {0}")]
    PermissionDenied(PathBuf),

    #[error("no space left while writing {0}")]
    DiskFull(PathBuf),

    #[error("{0} exists and is not a directory")]
    PathCollision(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProvisionError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => ProvisionError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::StorageFull => ProvisionError::DiskFull(path.to_path_buf()),
            io::ErrorKind::NotADirectory => ProvisionError::PathCollision(path.to_path_buf()),
            _ => ProvisionError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// A provisioned document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRoot {
    pub path: PathBuf,
    /// True when this call created the directory (and its landing page).
    pub newly_created: bool,
}

/// Materializes per-site directory trees under a fixed base.
#[derive(Debug, Clone)]
pub struct Provisioner {
    web_root: PathBuf,
    public_dir: String,
}

impl Provisioner {
    pub fn new(config: &SitesConfig) -> Self {
        Self {
            web_root: config.web_root.clone(),
            public_dir: config.public_dir.clone(),
        }
    }

    /// `<web_root>/<name>`, the directory owned by one site.
    pub fn site_dir(&self, name: &DomainName) -> PathBuf {
        self.web_root.join(name.as_str())
    }

    /// `<web_root>/<name>/<public_dir>`, the served directory.
    pub fn document_root(&self, name: &DomainName) -> PathBuf {
        self.site_dir(name).join(&self.public_dir)
    }

    /// Ensure the document root exists. Re-running on a provisioned site is a
    /// no-op success that leaves existing content untouched.
    pub async fn provision(&self, name: &DomainName) -> Result<DocumentRoot, ProvisionError> {
        let site_dir = self.site_dir(name);
        let root = self.document_root(name);

        for path in [&site_dir, &root] {
            ensure_not_collision(path).await?;
        }

        if is_dir(&root).await? {
            tracing::debug!(domain = %name, root = %root.display(), "Document root already provisioned");
            return Ok(DocumentRoot {
                path: root,
                newly_created: false,
            });
        }

        fs::create_dir_all(&root)
            .await
            .map_err(|e| ProvisionError::from_io(&root, e))?;

        let index = root.join(INDEX_FILE);
        fs::write(&index, landing_page(name))
            .await
            .map_err(|e| ProvisionError::from_io(&index, e))?;

        tracing::info!(domain = %name, root = %root.display(), "Provisioned document root");
        Ok(DocumentRoot {
            path: root,
            newly_created: true,
        })
    }

    /// Remove the whole site directory. Missing directories are not an error.
    pub async fn remove(&self, name: &DomainName) -> Result<(), ProvisionError> {
        let site_dir = self.site_dir(name);
        match fs::symlink_metadata(&site_dir).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&site_dir)
                .await
                .map_err(|e| ProvisionError::from_io(&site_dir, e))?,
            Ok(_) => return Err(ProvisionError::PathCollision(site_dir)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(ProvisionError::from_io(&site_dir, e)),
        }
        tracing::info!(domain = %name, path = %site_dir.display(), "Removed site directory");
        Ok(())
    }
}

async fn ensure_not_collision(path: &Path) -> Result<(), ProvisionError> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ProvisionError::PathCollision(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProvisionError::from_io(path, e)),
    }
}

async fn is_dir(path: &Path) -> Result<bool, ProvisionError> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProvisionError::from_io(path, e)),
    }
}

fn landing_page(name: &DomainName) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{name}</title>
</head>
<body>
    <h1>{name}</h1>
    <p>This site is ready. Upload your content to replace this page.</p>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioner(base: &Path) -> Provisioner {
        Provisioner::new(&SitesConfig {
            web_root: base.to_path_buf(),
            public_dir: "public_html".to_string(),
            purge_on_delete: true,
        })
    }

    #[tokio::test]
    async fn test_creates_root_with_landing_page() {
        let dir = tempfile::tempdir().unwrap();
        let p = provisioner(dir.path());
        let name = DomainName::parse("example.com").unwrap();

        let root = p.provision(&name).await.unwrap();
        assert!(root.newly_created);
        assert_eq!(root.path, dir.path().join("example.com/public_html"));

        let page = std::fs::read_to_string(root.path.join(INDEX_FILE)).unwrap();
        assert!(page.contains("<h1>example.com</h1>"));
    }

    #[tokio::test]
    async fn test_idempotent_and_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = provisioner(dir.path());
        let name = DomainName::parse("example.com").unwrap();

        let first = p.provision(&name).await.unwrap();
        std::fs::write(first.path.join(INDEX_FILE), "custom").unwrap();
        std::fs::write(first.path.join("app.js"), "uploaded").unwrap();

        let second = p.provision(&name).await.unwrap();
        assert_eq!(first.path, second.path);
        assert!(!second.newly_created);
        assert_eq!(std::fs::read_to_string(second.path.join(INDEX_FILE)).unwrap(), "custom");
        assert!(second.path.join("app.js").exists());
    }

    #[tokio::test]
    async fn test_file_in_the_way_is_collision() {
        let dir = tempfile::tempdir().unwrap();
        let p = provisioner(dir.path());
        let name = DomainName::parse("example.com").unwrap();
        std::fs::write(dir.path().join("example.com"), "not a dir").unwrap();

        let err = p.provision(&name).await.unwrap_err();
        assert!(matches!(err, ProvisionError::PathCollision(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_site_dir_is_collision() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let p = provisioner(dir.path());
        let name = DomainName::parse("example.com").unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), dir.path().join("example.com")).unwrap();

        let err = p.provision(&name).await.unwrap_err();
        assert!(matches!(err, ProvisionError::PathCollision(_)));
        assert!(std::fs::read_dir(elsewhere.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_remove_is_tolerant_of_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let p = provisioner(dir.path());
        let name = DomainName::parse("example.com").unwrap();

        p.remove(&name).await.unwrap();
        p.provision(&name).await.unwrap();
        p.remove(&name).await.unwrap();
        assert!(!p.site_dir(&name).exists());
    }
}
