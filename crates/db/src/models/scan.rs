//! Row model for the `scans` table.

use recon_core::scan::{ScanJob, ScanStatus};
use recon_core::store::StoreError;
use recon_core::types::{ScanId, Timestamp};
use sqlx::FromRow;

/// A row from the `scans` table. `status` is stored as its text name.
#[derive(Debug, Clone, FromRow)]
pub struct ScanRow {
    pub id: ScanId,
    pub domain: String,
    pub status: String,
    pub result: Option<String>,
    pub timeout_minutes: Option<i64>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ScanRow> for ScanJob {
    type Error = StoreError;

    fn try_from(row: ScanRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ScanStatus>()
            .map_err(|e| StoreError::Corrupt {
                id: row.id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(ScanJob {
            id: row.id,
            domain: row.domain,
            status,
            result: row.result,
            timeout_minutes: row.timeout_minutes,
            started_at: row.started_at,
            finished_at: row.finished_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
