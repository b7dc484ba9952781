//! Worker runtime seam: whatever actually runs the scanner processes.

use async_trait::async_trait;

use crate::types::ScanId;
use crate::worker::{WorkerHealth, WorkerRef};

/// Sentinel returned by [`WorkerRuntime::extract_output`] when logs cannot
/// be read.
pub const OUTPUT_UNAVAILABLE: &str = "[ERROR] Failed to retrieve logs";

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with code {code:?}: {stderr}")]
    CommandFailed {
        command: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{command} timed out after {secs}s")]
    Timeout { command: &'static str, secs: u64 },
}

/// Launches, inspects, and destroys scan workers.
///
/// Only [`WorkerRuntime::start_worker`] and
/// [`WorkerRuntime::count_live_workers`] report hard errors. Inspection and
/// output extraction degrade to [`WorkerHealth::Unknown`] and
/// [`OUTPUT_UNAVAILABLE`] so a single flaky worker never fails a tick.
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    /// Start a detached worker for the scan. Returns once the runtime has
    /// accepted the worker, not when the scan finishes.
    async fn start_worker(&self, domain: &str, scan_id: ScanId) -> Result<(), RuntimeError>;

    async fn inspect_health(&self, worker: &WorkerRef) -> WorkerHealth;

    async fn extract_output(&self, worker: &WorkerRef) -> String;

    async fn destroy_worker(&self, worker: &WorkerRef) -> Result<(), RuntimeError>;

    /// Number of live workers owned by this orchestrator.
    async fn count_live_workers(&self) -> Result<usize, RuntimeError>;
}
