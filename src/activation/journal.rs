//! Write-ahead markers for in-flight activations.
//!
//! A marker is written after the live config has been backed up and before
//! the staged file is renamed over it, and removed once the outcome is
//! settled. Any marker found at startup belongs to an activation that was
//! interrupted and must be rolled back.

use std::io;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::domain::record::unix_now;
use crate::domain::DomainName;

/// One interrupted-or-running activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub domain: DomainName,
    pub live_path: PathBuf,
    /// Copy of the previous live config, if there was one.
    pub backup_path: Option<PathBuf>,
    pub started_at: u64,
}

impl JournalEntry {
    pub fn new(domain: DomainName, live_path: PathBuf, backup_path: Option<PathBuf>) -> Self {
        Self {
            domain,
            live_path,
            backup_path,
            started_at: unix_now(),
        }
    }
}

/// Directory of activation markers, one file per domain.
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, domain: &DomainName) -> PathBuf {
        self.dir.join(format!("{domain}.json"))
    }

    /// Durably record `entry` before the swap.
    pub async fn begin(&self, entry: &JournalEntry) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.entry_path(&entry.domain);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await
    }

    /// Drop the marker for `domain`. Missing markers are fine.
    pub async fn finish(&self, domain: &DomainName) -> io::Result<()> {
        match fs::remove_file(self.entry_path(domain)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// All markers left on disk. Unreadable markers are logged and skipped.
    pub async fn pending(&self) -> io::Result<Vec<JournalEntry>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut pending = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_entry(&path).await {
                Ok(parsed) => pending.push(parsed),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable journal entry");
                }
            }
        }
        pending.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(pending)
    }
}

async fn read_entry(path: &Path) -> io::Result<JournalEntry> {
    let body = fs::read(path).await?;
    serde_json::from_slice(&body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
