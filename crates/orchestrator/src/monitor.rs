//! Periodic worker health monitor.
//!
//! Each tick inspects the worker of every in-progress scan, finalizes the
//! scans whose workers are gone, finished, or over their timeout, and then
//! runs the dispatcher. Ticks never overlap: the next one is only polled
//! after the previous tick, dispatch included, has returned. A scan may
//! therefore overrun its timeout by up to one interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use recon_core::classify::{self, OutputClassifier, WORKER_MISSING_RESULT};
use recon_core::error::CoreError;
use recon_core::runtime::WorkerRuntime;
use recon_core::scan::{ScanJob, ScanStatus};
use recon_core::types::{ScanId, Timestamp};
use recon_core::worker::{WorkerHealth, WorkerRef};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::service::ScanService;

/// Default delay between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum MonitorExit {
    #[error("Scan monitor returned before shutdown was requested")]
    Returned,

    #[error("Scan monitor task failed: {0}")]
    Crashed(#[from] JoinError),
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Scans moved to a terminal status this tick.
    pub finalized: Vec<(ScanId, ScanStatus)>,
    /// In-progress scans left as they were (still running or unknown).
    pub unchanged: usize,
    /// Scans whose processing hit an error; retried next tick.
    pub errors: usize,
    /// `None` when the dispatch phase failed.
    pub dispatch: Option<DispatchReport>,
}

pub struct Monitor {
    service: Arc<ScanService>,
    runtime: Arc<dyn WorkerRuntime>,
    dispatcher: Dispatcher,
    classifier: Arc<dyn OutputClassifier>,
    interval: Duration,
}

impl Monitor {
    pub fn new(
        service: Arc<ScanService>,
        runtime: Arc<dyn WorkerRuntime>,
        dispatcher: Dispatcher,
        classifier: Arc<dyn OutputClassifier>,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            runtime,
            dispatcher,
            classifier,
            interval,
        }
    }

    /// Run ticks until `cancel` fires. The first tick runs immediately so
    /// scans left running by a previous process are picked up at startup.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Scan monitor started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scan monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self
                        .tick()
                        .instrument(tracing::info_span!("monitor_tick"))
                        .await;
                    tracing::debug!(
                        finalized = report.finalized.len(),
                        unchanged = report.unchanged,
                        errors = report.errors,
                        "Monitor tick complete",
                    );
                }
            }
        }
    }

    /// One health pass over all in-progress scans, then dispatch.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        match self
            .service
            .store()
            .list_by_status(ScanStatus::InProgress)
            .await
        {
            Ok(running) => {
                for scan in running {
                    match self.check(&scan, Utc::now()).await {
                        Ok(Some(status)) => report.finalized.push((scan.id, status)),
                        Ok(None) => report.unchanged += 1,
                        Err(e) => {
                            report.errors += 1;
                            tracing::error!(
                                scan_id = %scan.id,
                                domain = %scan.domain,
                                error = %e,
                                "Failed to process running scan",
                            );
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to list running scans");
            }
        }

        match self.dispatcher.dispatch().await {
            Ok(dispatch) => report.dispatch = Some(dispatch),
            Err(e) => tracing::error!(error = %e, "Dispatch phase failed"),
        }

        report
    }

    /// Drive one scan through the health state machine. Returns the terminal
    /// status if the scan was finalized.
    async fn check(&self, scan: &ScanJob, now: Timestamp) -> Result<Option<ScanStatus>, CoreError> {
        let worker = WorkerRef::for_scan(scan.id, &scan.domain);

        match self.runtime.inspect_health(&worker).await {
            WorkerHealth::NotExist => {
                tracing::error!(
                    scan_id = %scan.id,
                    domain = %scan.domain,
                    worker = %worker,
                    "Worker disappeared before the scan completed",
                );
                let done = self
                    .service
                    .finalize(&scan.domain, ScanStatus::Failed, WORKER_MISSING_RESULT.to_string())
                    .await?;
                Ok(Some(done.status))
            }
            WorkerHealth::Stopped => {
                let output = self.runtime.extract_output(&worker).await;
                let verdict = self.classifier.classify(&output);
                let done = self
                    .service
                    .finalize(&scan.domain, verdict.status, verdict.result)
                    .await?;
                self.destroy(&worker).await;
                Ok(Some(done.status))
            }
            WorkerHealth::Running if scan.is_timed_out(now) => {
                tracing::warn!(
                    scan_id = %scan.id,
                    domain = %scan.domain,
                    timeout_minutes = ?scan.timeout_minutes,
                    "Scan exceeded its timeout",
                );
                let output = self.runtime.extract_output(&worker).await;
                let done = self
                    .service
                    .finalize(
                        &scan.domain,
                        ScanStatus::Timeout,
                        classify::partial_output(&output),
                    )
                    .await?;
                self.destroy(&worker).await;
                Ok(Some(done.status))
            }
            WorkerHealth::Running => Ok(None),
            WorkerHealth::Unknown => {
                tracing::debug!(
                    scan_id = %scan.id,
                    worker = %worker,
                    "Worker health unknown, retrying next tick",
                );
                Ok(None)
            }
        }
    }

    /// Remove a finished worker. The scan's outcome is already stored, so a
    /// failure here is only a leaked container.
    async fn destroy(&self, worker: &WorkerRef) {
        match self.runtime.destroy_worker(worker).await {
            Ok(()) => tracing::info!(worker = %worker, "Successfully deleted worker"),
            Err(e) => tracing::warn!(worker = %worker, error = %e, "Failed to delete worker"),
        }
    }
}

/// Wait for `shutdown`, then cancel the monitor and give it `grace` to stop.
///
/// The monitor task only ends on cancellation, so if it finishes (or
/// panics) before `shutdown` resolves, that is reported as an error and the
/// caller should exit.
pub async fn supervise(
    mut handle: JoinHandle<()>,
    cancel: CancellationToken,
    shutdown: impl Future<Output = ()>,
    grace: Duration,
) -> Result<(), MonitorExit> {
    tokio::select! {
        () = shutdown => {}
        joined = &mut handle => {
            cancel.cancel();
            return Err(match joined {
                Ok(()) => {
                    tracing::error!("Scan monitor exited unexpectedly");
                    MonitorExit::Returned
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scan monitor task failed");
                    MonitorExit::Crashed(e)
                }
            });
        }
    }

    cancel.cancel();
    if tokio::time::timeout(grace, handle).await.is_err() {
        tracing::warn!("Monitor did not stop within the grace period");
    }
    Ok(())
}
