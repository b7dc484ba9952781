//! Worker identity and health.
//!
//! A worker's name is a pure function of its scan, so a restarted
//! orchestrator can find a still-running worker from the scan row alone.

use std::fmt;

use serde::Serialize;

use crate::types::ScanId;

/// Prefix of every worker name owned by the orchestrator.
pub const WORKER_NAME_PREFIX: &str = "recon-scan";

/// Label present on every worker the orchestrator starts.
pub const OWNER_LABEL: &str = "recon.scan=true";

/// Label key carrying the scan id.
pub const SCAN_ID_LABEL_KEY: &str = "recon.scan.id";

/// Worker health as reported by one inspection. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerHealth {
    Running,
    Stopped,
    NotExist,
    /// Inspection failed or timed out; re-evaluated on the next tick.
    Unknown,
}

/// Name under which a scan's worker is registered with the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerRef(String);

impl WorkerRef {
    pub fn for_scan(scan_id: ScanId, domain: &str) -> Self {
        Self(format!("{WORKER_NAME_PREFIX}-{domain}-{scan_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
