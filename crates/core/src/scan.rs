//! Scan job model, lifecycle status, and the DTOs exposed to the request layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ScanId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Scan lifecycle status.
///
/// Moves forward only: `Queued -> InProgress -> {terminal}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    Queued,
    InProgress,
    Success,
    EmptyResult,
    Failed,
    Timeout,
}

impl ScanStatus {
    /// Statuses a scan may be finalized into.
    pub const TERMINAL: [ScanStatus; 4] = [
        ScanStatus::Success,
        ScanStatus::EmptyResult,
        ScanStatus::Failed,
        ScanStatus::Timeout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Queued => "QUEUED",
            ScanStatus::InProgress => "IN_PROGRESS",
            ScanStatus::Success => "SUCCESS",
            ScanStatus::EmptyResult => "EMPTY_RESULT",
            ScanStatus::Failed => "FAILED",
            ScanStatus::Timeout => "TIMEOUT",
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// `Queued` or `InProgress`: at most one such scan may exist per domain.
    pub fn is_active(self) -> bool {
        matches!(self, ScanStatus::Queued | ScanStatus::InProgress)
    }
}

impl FromStr for ScanStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(ScanStatus::Queued),
            "IN_PROGRESS" => Ok(ScanStatus::InProgress),
            "SUCCESS" => Ok(ScanStatus::Success),
            "EMPTY_RESULT" => Ok(ScanStatus::EmptyResult),
            "FAILED" => Ok(ScanStatus::Failed),
            "TIMEOUT" => Ok(ScanStatus::Timeout),
            other => Err(CoreError::InvalidArgument(format!(
                "Unknown scan status: {other}"
            ))),
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One requested domain scan and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanJob {
    pub id: ScanId,
    pub domain: String,
    pub status: ScanStatus,
    pub result: Option<String>,
    /// Absent or non-positive means the scan never times out.
    pub timeout_minutes: Option<i64>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ScanJob {
    /// Build a fresh `Queued` scan for an already-normalized domain.
    pub fn queued(domain: String, timeout_minutes: Option<i64>, now: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            domain,
            status: ScanStatus::Queued,
            result: None,
            timeout_minutes,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move a queued scan to `InProgress`.
    pub fn start(&mut self, now: Timestamp) -> Result<(), CoreError> {
        if self.status != ScanStatus::Queued {
            return Err(CoreError::InvalidArgument(format!(
                "Cannot start scan {} in status {}",
                self.id, self.status
            )));
        }
        self.status = ScanStatus::InProgress;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Move an in-progress scan to a terminal status.
    pub fn finish(
        &mut self,
        status: ScanStatus,
        result: String,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if !status.is_terminal() {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid finalize status: {status}"
            )));
        }
        if self.status != ScanStatus::InProgress {
            return Err(CoreError::InvalidArgument(format!(
                "Cannot finalize scan {} in status {}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.result = Some(result);
        self.finished_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Whether the configured timeout has elapsed at `now`.
    ///
    /// Only meaningful for running scans. Precision is bounded by how often
    /// the caller checks. A deadline that does not fit in a timestamp never
    /// elapses.
    pub fn is_timed_out(&self, now: Timestamp) -> bool {
        let (Some(minutes), Some(started_at)) = (self.timeout_minutes, self.started_at) else {
            return false;
        };
        if minutes <= 0 {
            return false;
        }
        chrono::Duration::try_minutes(minutes)
            .and_then(|limit| started_at.checked_add_signed(limit))
            .is_some_and(|deadline| now > deadline)
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            id: self.id,
            domain: self.domain.clone(),
            status: self.status,
            result: self.result.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Request-layer DTOs
// ---------------------------------------------------------------------------

/// Largest timeout a submission may ask for: one year.
pub const MAX_TIMEOUT_MINUTES: i64 = 365 * 24 * 60;

/// Reject a requested timeout above [`MAX_TIMEOUT_MINUTES`]. Absent or
/// non-positive values mean "no timeout" and pass through.
pub fn validate_timeout(timeout_minutes: Option<i64>) -> Result<Option<i64>, CoreError> {
    match timeout_minutes {
        Some(minutes) if minutes > MAX_TIMEOUT_MINUTES => Err(CoreError::InvalidArgument(
            format!("Timeout of {minutes} minutes exceeds the maximum of {MAX_TIMEOUT_MINUTES}"),
        )),
        other => Ok(other),
    }
}

pub const MSG_ALREADY_IN_PROGRESS: &str = "Scan is already in progress.";
pub const MSG_ALREADY_QUEUED: &str = "Scan is already queued.";
pub const MSG_QUEUED: &str = "Scan is queued and will be started soon.";

/// Response to a submission, whether it created a scan or matched one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub id: ScanId,
    pub domain: String,
    pub status: ScanStatus,
    pub message: String,
}

impl SubmitOutcome {
    pub fn for_scan(scan: &ScanJob, message: &str) -> Self {
        Self {
            id: scan.id,
            domain: scan.domain.clone(),
            status: scan.status,
            message: message.to_string(),
        }
    }
}

/// Listing view of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub id: ScanId,
    pub domain: String,
    pub status: ScanStatus,
    pub result: Option<String>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// One page of a listing, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total: self.total,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
