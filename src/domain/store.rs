//! Domain record persistence.
//!
//! Reads are served from memory. Every mutation holds the write lock from
//! the in-memory change through the file write (and the revert, if the
//! write fails), so a snapshot never contains another caller's uncommitted
//! change.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::name::DomainName;
use crate::domain::record::DomainRecord;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record for {0} already exists")]
    AlreadyExists(String),

    #[error("no record for {0}")]
    Missing(String),

    #[error("failed to persist records to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to load records from {path}: {reason}")]
    Load { path: PathBuf, reason: String },
}

/// Keyed storage for domain records.
///
/// Implementations must leave their contents unchanged when an operation
/// returns an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn get(&self, name: &DomainName) -> Option<DomainRecord>;

    fn contains(&self, name: &DomainName) -> bool {
        self.get(name).is_some()
    }

    /// All records, ordered by name.
    fn list(&self) -> Vec<DomainRecord>;

    /// Create a record. Fails if the name is already present.
    async fn insert(&self, record: DomainRecord) -> Result<(), StoreError>;

    /// Replace an existing record.
    async fn update(&self, record: DomainRecord) -> Result<(), StoreError>;

    async fn remove(&self, name: &DomainName) -> Result<Option<DomainRecord>, StoreError>;
}

/// Record store backed by a concurrent map, optionally mirrored to a JSON file.
#[derive(Clone, Default)]
pub struct JsonRecordStore {
    inner: Arc<DashMap<DomainName, DomainRecord>>,
    persistence_path: Option<PathBuf>,
    /// Held by each mutation until its snapshot is on disk or reverted.
    write_lock: Arc<Mutex<()>>,
}

impl JsonRecordStore {
    /// In-memory store with no backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`, loading existing records if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let store = Self {
            inner: Arc::new(DashMap::new()),
            persistence_path: Some(path.clone()),
            write_lock: Arc::new(Mutex::new(())),
        };

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StoreError::Load {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let records: Vec<DomainRecord> =
                serde_json::from_str(&content).map_err(|e| StoreError::Load {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            for record in records {
                store.inner.insert(record.name.clone(), record);
            }
            tracing::info!(path = %path.display(), count = store.inner.len(), "Loaded domain records");
        }

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Write the current snapshot via temp file + rename, off the async
    /// workers. Callers hold `write_lock`.
    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let snapshot: BTreeMap<DomainName, DomainRecord> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let records: Vec<&DomainRecord> = snapshot.values().collect();
        let count = records.len();

        let persist_err = |source: io::Error| StoreError::Persist {
            path: path.clone(),
            source,
        };

        let body = serde_json::to_vec_pretty(&records)
            .map_err(|e| persist_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&target, &body))
            .await
            .map_err(|e| persist_err(io::Error::other(e)))?
            .map_err(persist_err)?;

        tracing::debug!(path = %path.display(), count, "Persisted domain records");
        Ok(())
    }
}

fn write_snapshot(path: &Path, body: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    fn get(&self, name: &DomainName) -> Option<DomainRecord> {
        self.inner.get(name).map(|r| r.value().clone())
    }

    fn contains(&self, name: &DomainName) -> bool {
        self.inner.contains_key(name)
    }

    fn list(&self) -> Vec<DomainRecord> {
        let mut records: Vec<DomainRecord> =
            self.inner.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    async fn insert(&self, record: DomainRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let name = record.name.clone();
        match self.inner.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StoreError::AlreadyExists(name.to_string()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        if let Err(e) = self.persist().await {
            self.inner.remove(&name);
            return Err(e);
        }
        Ok(())
    }

    async fn update(&self, record: DomainRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let name = record.name.clone();
        let previous = match self.inner.get_mut(&name) {
            Some(mut slot) => std::mem::replace(slot.value_mut(), record),
            None => return Err(StoreError::Missing(name.to_string())),
        };

        if let Err(e) = self.persist().await {
            self.inner.insert(name, previous);
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, name: &DomainName) -> Result<Option<DomainRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let Some((_, removed)) = self.inner.remove(name) else {
            return Ok(None);
        };

        if let Err(e) = self.persist().await {
            self.inner.insert(name.clone(), removed);
            return Err(e);
        }
        Ok(Some(removed))
    }
}
