//! Per-domain mutual exclusion.
//!
//! Every mutation of a domain's scans (submit, launch, finalize) runs while
//! holding that domain's lock, which is what keeps two active scans from
//! ever existing for one domain. Different domains never contend.
//!
//! Entries are created on first use and dropped once nobody holds or waits
//! on them, so the table only grows with the number of domains currently
//! being touched. Handles are cloned and entries removed under the same
//! DashMap shard lock, and removal requires the map to hold the only
//! reference. A task can therefore never end up waiting on a lock that has
//! already been evicted, and acquisition needs no retry.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct DomainLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held for the duration of a critical section. Dropping it releases the
/// domain and evicts the table entry if no one else references it.
#[derive(Debug)]
pub struct DomainLockGuard<'a> {
    table: &'a DomainLocks,
    domain: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `domain`.
    pub async fn acquire(&self, domain: &str) -> DomainLockGuard<'_> {
        let handle = {
            let entry = self
                .locks
                .entry(domain.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };

        let guard = handle.lock_owned().await;

        DomainLockGuard {
            table: self,
            domain: domain.to_owned(),
            guard: Some(guard),
        }
    }

    /// Run `f` while holding the lock for `domain`.
    pub async fn with_lock<T, F, Fut>(&self, domain: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(domain).await;
        f().await
    }

    /// Number of domains with a live entry (held or awaited).
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl DomainLockGuard<'_> {
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Drop for DomainLockGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so our own reference is gone before the count check.
        drop(self.guard.take());
        self.table
            .locks
            .remove_if(&self.domain, |_, lock| Arc::strong_count(lock) == 1);
    }
}
