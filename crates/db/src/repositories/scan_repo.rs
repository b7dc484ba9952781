//! Repository for the `scans` table.
//!
//! Every status literal goes through [`ScanStatus::as_str`]; the table's
//! CHECK constraint rejects anything else.

use recon_core::scan::{ScanJob, ScanStatus};
use sqlx::PgPool;

use crate::models::scan::ScanRow;

/// Column list for `scans` queries.
const COLUMNS: &str = "\
    id, domain, status, result, timeout_minutes, \
    started_at, finished_at, created_at, updated_at";

/// Maximum page size for scan listing.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Provides CRUD operations for scan jobs.
pub struct ScanRepo;

impl ScanRepo {
    /// Insert a new scan row exactly as given.
    pub async fn insert(pool: &PgPool, scan: &ScanJob) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO scans \
                 (id, domain, status, result, timeout_minutes, \
                  started_at, finished_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(scan.id)
        .bind(&scan.domain)
        .bind(scan.status.as_str())
        .bind(&scan.result)
        .bind(scan.timeout_minutes)
        .bind(scan.started_at)
        .bind(scan.finished_at)
        .bind(scan.created_at)
        .bind(scan.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Most recently started scan for a domain; not-yet-started scans first.
    pub async fn find_latest_by_domain(
        pool: &PgPool,
        domain: &str,
    ) -> Result<Option<ScanRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scans \
             WHERE domain = $1 \
             ORDER BY started_at DESC NULLS FIRST, created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ScanRow>(&query)
            .bind(domain)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_domain_and_status(
        pool: &PgPool,
        domain: &str,
        status: ScanStatus,
    ) -> Result<Option<ScanRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scans \
             WHERE domain = $1 AND status = $2 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ScanRow>(&query)
            .bind(domain)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Up to `limit` scans in `status`, oldest first.
    pub async fn list_by_status_oldest_first(
        pool: &PgPool,
        status: ScanStatus,
        limit: i64,
    ) -> Result<Vec<ScanRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scans \
             WHERE status = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, ScanRow>(&query)
            .bind(status.as_str())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_status(
        pool: &PgPool,
        status: ScanStatus,
    ) -> Result<Vec<ScanRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scans WHERE status = $1");
        sqlx::query_as::<_, ScanRow>(&query)
            .bind(status.as_str())
            .fetch_all(pool)
            .await
    }

    /// Persist the mutable columns of a scan. Returns `true` if a row matched.
    pub async fn update(pool: &PgPool, scan: &ScanJob) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scans \
             SET status = $2, result = $3, started_at = $4, \
                 finished_at = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(scan.id)
        .bind(scan.status.as_str())
        .bind(&scan.result)
        .bind(scan.started_at)
        .bind(scan.finished_at)
        .bind(scan.updated_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of all scans, newest first. `page_size` is capped at
    /// [`MAX_PAGE_SIZE`].
    pub async fn list_page(
        pool: &PgPool,
        page_index: i64,
        page_size: i64,
    ) -> Result<Vec<ScanRow>, sqlx::Error> {
        let limit = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = page_index.max(0) * limit;

        let query = format!(
            "SELECT {COLUMNS} FROM scans \
             ORDER BY created_at DESC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, ScanRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scans")
            .fetch_one(pool)
            .await
    }
}
