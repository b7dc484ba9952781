//! Docker CLI argument builders and output parsers.
//!
//! Kept free of process handling so the parsing rules can be tested without
//! a Docker daemon.

use recon_core::types::ScanId;
use recon_core::worker::{WorkerHealth, WorkerRef, OWNER_LABEL, SCAN_ID_LABEL_KEY};

/// Fragment Docker prints on stderr when the inspected object is unknown.
const NO_SUCH_OBJECT: &str = "no such object";

/// `docker run` arguments for a detached scan worker.
pub fn run_args(image: &str, worker: &WorkerRef, scan_id: ScanId, domain: &str) -> Vec<String> {
    vec![
        "run".into(),
        "-d".into(),
        "--name".into(),
        worker.as_str().into(),
        "--label".into(),
        OWNER_LABEL.into(),
        "--label".into(),
        format!("{SCAN_ID_LABEL_KEY}={scan_id}"),
        image.into(),
        "enum".into(),
        "-d".into(),
        domain.into(),
    ]
}

pub fn inspect_args(worker: &WorkerRef) -> Vec<String> {
    vec![
        "inspect".into(),
        "-f".into(),
        "{{.State.Status}}".into(),
        worker.as_str().into(),
    ]
}

pub fn logs_args(worker: &WorkerRef) -> Vec<String> {
    vec!["logs".into(), worker.as_str().into()]
}

pub fn remove_args(worker: &WorkerRef) -> Vec<String> {
    vec!["rm".into(), "-f".into(), worker.as_str().into()]
}

pub fn list_owned_args() -> Vec<String> {
    vec![
        "ps".into(),
        "-q".into(),
        "--filter".into(),
        format!("label={OWNER_LABEL}"),
    ]
}

/// Map `docker inspect -f {{.State.Status}}` output to a health verdict.
///
/// Returns the verdict and, for unrecognised states, the raw status so the
/// caller can log it.
pub fn parse_inspect(stdout: &str, stderr: &str) -> (WorkerHealth, Option<String>) {
    if stderr.to_lowercase().contains(NO_SUCH_OBJECT) {
        return (WorkerHealth::NotExist, None);
    }

    match stdout.trim() {
        "running" => (WorkerHealth::Running, None),
        "exited" => (WorkerHealth::Stopped, None),
        other => (WorkerHealth::Unknown, Some(other.to_string())),
    }
}

/// Count container IDs in `docker ps -q` output.
pub fn count_ids(stdout: &str) -> usize {
    stdout.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Merge captured stdout and stderr into one trimmed log text.
pub fn merge_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    let err = String::from_utf8_lossy(stderr);
    if !err.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&err);
    }
    text.trim().to_string()
}
