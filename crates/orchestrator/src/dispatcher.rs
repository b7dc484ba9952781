//! Admission control for queued scans.
//!
//! Runs once per monitor tick. Fills the free worker slots with the oldest
//! queued scans, launching each one independently so a single bad launch
//! does not hold back the rest of the batch.

use std::sync::Arc;

use recon_core::error::CoreError;
use recon_core::runtime::WorkerRuntime;
use recon_core::scan::ScanStatus;
use recon_core::types::ScanId;

use crate::service::ScanService;

/// Default cap on concurrently running workers.
pub const DEFAULT_MAX_ACTIVE_WORKERS: usize = 10;

/// What one dispatch pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub live_workers: usize,
    pub free_slots: usize,
    pub launched: Vec<ScanId>,
    pub failed: Vec<ScanId>,
}

pub struct Dispatcher {
    service: Arc<ScanService>,
    runtime: Arc<dyn WorkerRuntime>,
    max_active_workers: usize,
}

/// Slots left under the cap. Never negative, even when more workers are
/// live than allowed.
pub fn free_slots(max_active_workers: usize, live_workers: usize) -> usize {
    max_active_workers.saturating_sub(live_workers)
}

impl Dispatcher {
    pub fn new(
        service: Arc<ScanService>,
        runtime: Arc<dyn WorkerRuntime>,
        max_active_workers: usize,
    ) -> Self {
        Self {
            service,
            runtime,
            max_active_workers,
        }
    }

    /// Launch as many queued scans as there are free worker slots.
    ///
    /// Fails only if the live worker count or the queue cannot be read; an
    /// inaccurate count would break the cap, so it is never guessed.
    pub async fn dispatch(&self) -> Result<DispatchReport, CoreError> {
        let live_workers = self.runtime.count_live_workers().await?;
        let free_slots = free_slots(self.max_active_workers, live_workers);

        let mut report = DispatchReport {
            live_workers,
            free_slots,
            ..DispatchReport::default()
        };

        if free_slots == 0 {
            tracing::info!(
                live_workers,
                max_active_workers = self.max_active_workers,
                "No free worker slots, queued scans stay queued",
            );
            return Ok(report);
        }

        let queued = self
            .service
            .store()
            .list_by_status_oldest_first(ScanStatus::Queued, free_slots)
            .await?;

        for scan in queued {
            tracing::info!(scan_id = %scan.id, domain = %scan.domain, "Launching scan");
            match self.service.launch(&scan.domain).await {
                Ok(launched) => report.launched.push(launched.id),
                Err(e) => {
                    tracing::error!(
                        scan_id = %scan.id,
                        domain = %scan.domain,
                        error = %e,
                        "Failed to launch scan",
                    );
                    report.failed.push(scan.id);
                }
            }
        }

        Ok(report)
    }
}
