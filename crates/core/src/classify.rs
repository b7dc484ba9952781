//! Classification of finished worker output into a terminal scan status.
//!
//! The scanner reports "nothing found" only through its log text, so the
//! verdict is a heuristic over that text. It lives behind
//! [`OutputClassifier`] so a different scanner can bring its own rules
//! without touching the monitor state machine.

use crate::scan::ScanStatus;

/// Placeholder stored as the result when a worker produced no output.
pub const NO_OUTPUT: &str = "[NO OUTPUT]";

/// Result stored when a running scan's worker has disappeared.
pub const WORKER_MISSING_RESULT: &str = "[AN ERROR OCCURRED AND NO SCAN OUTPUT IS AVAILABLE]";

/// Marker the default scanner prints when enumeration found nothing.
pub const NO_ASSETS_MARKER: &str = "No assets were discovered";

/// Terminal verdict for a stopped worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: ScanStatus,
    pub result: String,
}

/// Decides the terminal status of a scan whose worker exited on its own.
pub trait OutputClassifier: Send + Sync {
    fn classify(&self, output: &str) -> Classification;
}

/// Default rules: empty output or the "no assets" marker (case-insensitive)
/// is `EmptyResult`, anything else is `Success`.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    marker: String,
}

impl MarkerClassifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(NO_ASSETS_MARKER)
    }
}

impl OutputClassifier for MarkerClassifier {
    fn classify(&self, output: &str) -> Classification {
        let trimmed = output.trim();
        if trimmed.is_empty() {
            return Classification {
                status: ScanStatus::EmptyResult,
                result: NO_OUTPUT.to_string(),
            };
        }

        let status = if trimmed.to_lowercase().contains(&self.marker) {
            ScanStatus::EmptyResult
        } else {
            ScanStatus::Success
        };

        Classification {
            status,
            result: trimmed.to_string(),
        }
    }
}

/// Output stored for a timed-out scan: whatever the worker printed so far,
/// or the placeholder when that is blank.
pub fn partial_output(output: &str) -> String {
    if output.trim().is_empty() {
        NO_OUTPUT.to_string()
    } else {
        output.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_is_empty_result_with_placeholder() {
        let verdict = MarkerClassifier::default().classify("");
        assert_eq!(verdict.status, ScanStatus::EmptyResult);
        assert_eq!(verdict.result, NO_OUTPUT);
    }

    #[test]
    fn whitespace_only_output_counts_as_empty() {
        let verdict = MarkerClassifier::default().classify("  \n\t ");
        assert_eq!(verdict.status, ScanStatus::EmptyResult);
        assert_eq!(verdict.result, NO_OUTPUT);
    }

    #[test]
    fn marker_yields_empty_result_and_keeps_text() {
        let output = "Querying sources...\nNo assets were discovered\n";
        let verdict = MarkerClassifier::default().classify(output);
        assert_eq!(verdict.status, ScanStatus::EmptyResult);
        assert_eq!(verdict.result, output.trim());
    }

    #[test]
    fn marker_match_ignores_case() {
        let verdict = MarkerClassifier::default().classify("NO ASSETS WERE DISCOVERED");
        assert_eq!(verdict.status, ScanStatus::EmptyResult);
    }

    #[test]
    fn findings_are_success() {
        let verdict = MarkerClassifier::default().classify("found: api.example.com");
        assert_eq!(verdict.status, ScanStatus::Success);
        assert_eq!(verdict.result, "found: api.example.com");
    }

    #[test]
    fn custom_marker() {
        let classifier = MarkerClassifier::new("0 results");
        assert_eq!(
            classifier.classify("scan done: 0 RESULTS").status,
            ScanStatus::EmptyResult
        );
        assert_eq!(
            classifier.classify("No assets were discovered").status,
            ScanStatus::Success
        );
    }

    #[test]
    fn partial_output_falls_back_to_placeholder() {
        assert_eq!(partial_output("   "), NO_OUTPUT);
        assert_eq!(partial_output("a.example.com"), "a.example.com");
    }
}
