//! Per-domain mutual exclusion.
//!
//! Requests for the same name run one at a time; requests for different
//! names never contend. Idle entries are dropped when their last holder
//! releases them, so the map only grows with in-flight names.

use std::sync::Arc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::DomainName;

type LockMap = DashMap<DomainName, Arc<Mutex<()>>>;

/// Registry of per-domain async locks.
#[derive(Clone, Default)]
pub struct DomainLocks {
    inner: Arc<LockMap>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    pub async fn lock(&self, name: &DomainName) -> DomainGuard {
        let mutex = self.inner.entry(name.clone()).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        DomainGuard {
            name: name.clone(),
            locks: self.inner.clone(),
            guard: Some(guard),
        }
    }

    /// Number of names currently locked or waited on.
    pub fn in_flight(&self) -> usize {
        self.inner.len()
    }
}

/// Exclusive access to one domain; released on drop.
pub struct DomainGuard {
    name: DomainName,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DomainGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map still references the mutex: nobody is waiting.
        self.locks
            .remove_if(&self.name, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
