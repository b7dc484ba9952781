//! Scan submission and the locked state transitions shared by the
//! dispatcher and monitor.

use std::sync::Arc;

use chrono::Utc;
use recon_core::domain;
use recon_core::error::CoreError;
use recon_core::runtime::WorkerRuntime;
use recon_core::scan::{
    validate_timeout, Page, ScanJob, ScanStatus, ScanSummary, SubmitOutcome,
    MSG_ALREADY_IN_PROGRESS, MSG_ALREADY_QUEUED, MSG_QUEUED,
};
use recon_core::store::ScanStore;

use crate::lock::DomainLocks;

/// Owns every mutation of scan rows. Each one runs under the scan's domain
/// lock.
pub struct ScanService {
    store: Arc<dyn ScanStore>,
    runtime: Arc<dyn WorkerRuntime>,
    locks: DomainLocks,
}

impl ScanService {
    pub fn new(store: Arc<dyn ScanStore>, runtime: Arc<dyn WorkerRuntime>) -> Self {
        Self {
            store,
            runtime,
            locks: DomainLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ScanStore> {
        &self.store
    }

    pub fn locks(&self) -> &DomainLocks {
        &self.locks
    }

    /// Queue a scan for `raw_domain`, or return the one already active.
    ///
    /// Resubmitting a domain whose latest scan is still queued or running is
    /// a no-op that reports the existing scan.
    pub async fn submit(
        &self,
        raw_domain: &str,
        timeout_minutes: Option<i64>,
    ) -> Result<SubmitOutcome, CoreError> {
        let domain = domain::normalize(raw_domain)?;
        let timeout_minutes = validate_timeout(timeout_minutes)?;

        self.locks
            .with_lock(&domain, || async {
                if let Some(existing) = self.store.find_latest_by_domain(&domain).await? {
                    match existing.status {
                        ScanStatus::InProgress => {
                            return Ok(SubmitOutcome::for_scan(&existing, MSG_ALREADY_IN_PROGRESS));
                        }
                        ScanStatus::Queued => {
                            return Ok(SubmitOutcome::for_scan(&existing, MSG_ALREADY_QUEUED));
                        }
                        _ => {}
                    }
                }

                let scan = ScanJob::queued(domain.clone(), timeout_minutes, Utc::now());
                self.store.create(&scan).await?;

                tracing::info!(
                    scan_id = %scan.id,
                    domain = %scan.domain,
                    timeout_minutes = ?scan.timeout_minutes,
                    "Scan queued",
                );
                Ok::<_, CoreError>(SubmitOutcome::for_scan(&scan, MSG_QUEUED))
            })
            .await
    }

    /// One page of scans, newest first.
    pub async fn list_scans(
        &self,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<ScanSummary>, CoreError> {
        let page = self.store.list_page(page_index, page_size).await?;
        Ok(page.map(|scan| scan.summary()))
    }

    /// Move the domain's queued scan to `InProgress` and ask the runtime to
    /// start its worker.
    ///
    /// The start request runs on its own task; this returns as soon as the
    /// status change is persisted. A start that fails leaves no worker
    /// behind, which the monitor later reports as a failed scan.
    pub async fn launch(&self, domain: &str) -> Result<ScanJob, CoreError> {
        self.locks
            .with_lock(domain, || async {
                let mut scan = self
                    .store
                    .find_by_domain_and_status(domain, ScanStatus::Queued)
                    .await?
                    .ok_or_else(|| CoreError::NotFound {
                        entity: "queued scan",
                        key: domain.to_string(),
                    })?;

                scan.start(Utc::now())?;
                self.store.update(&scan).await?;

                let runtime = Arc::clone(&self.runtime);
                let (worker_domain, scan_id) = (scan.domain.clone(), scan.id);
                tokio::spawn(async move {
                    if let Err(e) = runtime.start_worker(&worker_domain, scan_id).await {
                        tracing::error!(
                            scan_id = %scan_id,
                            domain = %worker_domain,
                            error = %e,
                            "Failed to start scan worker",
                        );
                    }
                });

                tracing::info!(scan_id = %scan.id, domain = %scan.domain, "Scan launched");
                Ok::<_, CoreError>(scan)
            })
            .await
    }

    /// Record the terminal outcome of the domain's running scan.
    pub async fn finalize(
        &self,
        domain: &str,
        status: ScanStatus,
        result: String,
    ) -> Result<ScanJob, CoreError> {
        if !status.is_terminal() {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid finalize status: {status}"
            )));
        }

        self.locks
            .with_lock(domain, || async {
                let mut scan = self
                    .store
                    .find_by_domain_and_status(domain, ScanStatus::InProgress)
                    .await?
                    .ok_or_else(|| CoreError::NotFound {
                        entity: "in-progress scan",
                        key: domain.to_string(),
                    })?;

                scan.finish(status, result, Utc::now())?;
                self.store.update(&scan).await?;

                tracing::info!(
                    scan_id = %scan.id,
                    domain = %scan.domain,
                    status = %scan.status,
                    "Scan finalized",
                );
                Ok::<_, CoreError>(scan)
            })
            .await
    }
}
