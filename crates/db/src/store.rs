//! [`ScanStore`] backed by Postgres.

use async_trait::async_trait;
use recon_core::scan::{Page, ScanJob, ScanStatus};
use recon_core::store::{ScanStore, StoreError};
use sqlx::PgPool;

use crate::models::scan::ScanRow;
use crate::repositories::scan_repo::MAX_PAGE_SIZE;
use crate::repositories::ScanRepo;

#[derive(Debug, Clone)]
pub struct PgScanStore {
    pool: PgPool,
}

impl PgScanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn convert(row: ScanRow) -> Result<ScanJob, StoreError> {
    ScanJob::try_from(row)
}

fn convert_all(rows: Vec<ScanRow>) -> Result<Vec<ScanJob>, StoreError> {
    rows.into_iter().map(convert).collect()
}

#[async_trait]
impl ScanStore for PgScanStore {
    async fn create(&self, scan: &ScanJob) -> Result<(), StoreError> {
        ScanRepo::insert(&self.pool, scan)
            .await
            .map_err(StoreError::backend)
    }

    async fn find_latest_by_domain(&self, domain: &str) -> Result<Option<ScanJob>, StoreError> {
        ScanRepo::find_latest_by_domain(&self.pool, domain)
            .await
            .map_err(StoreError::backend)?
            .map(convert)
            .transpose()
    }

    async fn find_by_domain_and_status(
        &self,
        domain: &str,
        status: ScanStatus,
    ) -> Result<Option<ScanJob>, StoreError> {
        ScanRepo::find_by_domain_and_status(&self.pool, domain, status)
            .await
            .map_err(StoreError::backend)?
            .map(convert)
            .transpose()
    }

    async fn list_by_status_oldest_first(
        &self,
        status: ScanStatus,
        limit: usize,
    ) -> Result<Vec<ScanJob>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = ScanRepo::list_by_status_oldest_first(&self.pool, status, limit)
            .await
            .map_err(StoreError::backend)?;
        convert_all(rows)
    }

    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<ScanJob>, StoreError> {
        let rows = ScanRepo::list_by_status(&self.pool, status)
            .await
            .map_err(StoreError::backend)?;
        convert_all(rows)
    }

    async fn update(&self, scan: &ScanJob) -> Result<(), StoreError> {
        let matched = ScanRepo::update(&self.pool, scan)
            .await
            .map_err(StoreError::backend)?;
        if !matched {
            tracing::error!(scan_id = %scan.id, "Scan row vanished before update");
            return Err(StoreError::backend(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    async fn list_page(
        &self,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<ScanJob>, StoreError> {
        let size = i64::from(page_size).clamp(1, MAX_PAGE_SIZE);
        let rows = ScanRepo::list_page(&self.pool, i64::from(page_index), size)
            .await
            .map_err(StoreError::backend)?;
        let total = ScanRepo::count(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(Page {
            items: convert_all(rows)?,
            page_index,
            page_size: size as u32,
            total: total.max(0) as u64,
        })
    }
}
