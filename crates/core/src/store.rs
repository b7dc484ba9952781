//! Persistence seam for scan jobs.

use async_trait::async_trait;

use crate::scan::{Page, ScanJob, ScanStatus};

/// Error raised by a [`ScanStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Corrupt scan row {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Durable record of scan jobs.
///
/// Callers serialize mutations per domain; implementations only need to be
/// safe for concurrent use across domains.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn create(&self, scan: &ScanJob) -> Result<(), StoreError>;

    /// Most recently started scan for a domain. Scans that have not started
    /// yet sort before started ones; ties fall back to newest `created_at`.
    async fn find_latest_by_domain(&self, domain: &str) -> Result<Option<ScanJob>, StoreError>;

    async fn find_by_domain_and_status(
        &self,
        domain: &str,
        status: ScanStatus,
    ) -> Result<Option<ScanJob>, StoreError>;

    /// Up to `limit` scans in `status`, oldest `created_at` first.
    async fn list_by_status_oldest_first(
        &self,
        status: ScanStatus,
        limit: usize,
    ) -> Result<Vec<ScanJob>, StoreError>;

    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<ScanJob>, StoreError>;

    async fn update(&self, scan: &ScanJob) -> Result<(), StoreError>;

    /// All scans, newest `created_at` first.
    async fn list_page(&self, page_index: u32, page_size: u32)
        -> Result<Page<ScanJob>, StoreError>;
}
