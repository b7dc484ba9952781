#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use recon_core::classify::MarkerClassifier;
use recon_core::runtime::{RuntimeError, WorkerRuntime};
use recon_core::scan::{Page, ScanJob, ScanStatus};
use recon_core::store::{ScanStore, StoreError};
use recon_core::types::{ScanId, Timestamp};
use recon_core::worker::{WorkerHealth, WorkerRef};
use recon_orchestrator::{Dispatcher, Monitor, ScanService};

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// [`ScanStore`] over a vector, with the same ordering rules as Postgres.
#[derive(Default)]
pub struct MemoryStore {
    scans: Mutex<Vec<ScanJob>>,
    failing_domains: Mutex<HashSet<String>>,
}

impl MemoryStore {
    /// Insert a scan directly, bypassing submission.
    pub fn insert(&self, scan: ScanJob) {
        self.scans.lock().unwrap().push(scan);
    }

    /// Insert an in-progress scan that started at `started_at`.
    pub fn insert_running(
        &self,
        domain: &str,
        timeout_minutes: Option<i64>,
        started_at: Timestamp,
    ) -> ScanJob {
        let mut scan = ScanJob::queued(domain.to_string(), timeout_minutes, started_at);
        scan.start(started_at).unwrap();
        self.insert(scan.clone());
        scan
    }

    /// Insert a queued scan created at `created_at`.
    pub fn insert_queued(&self, domain: &str, created_at: Timestamp) -> ScanJob {
        let scan = ScanJob::queued(domain.to_string(), None, created_at);
        self.insert(scan.clone());
        scan
    }

    /// Make every later `update` of a scan for `domain` fail.
    pub fn fail_updates_for(&self, domain: &str) {
        self.failing_domains
            .lock()
            .unwrap()
            .insert(domain.to_string());
    }

    pub fn get(&self, id: ScanId) -> ScanJob {
        self.scans
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .expect("scan exists")
    }

    pub fn all(&self) -> Vec<ScanJob> {
        self.scans.lock().unwrap().clone()
    }

    pub fn active_for(&self, domain: &str) -> usize {
        self.all()
            .iter()
            .filter(|s| s.domain == domain && s.status.is_active())
            .count()
    }
}

/// Not-yet-started first, then newest `started_at`, then newest `created_at`.
fn latest_first(a: &ScanJob, b: &ScanJob) -> Ordering {
    let by_start = match (a.started_at, b.started_at) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    };
    by_start.then_with(|| b.created_at.cmp(&a.created_at))
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn create(&self, scan: &ScanJob) -> Result<(), StoreError> {
        self.insert(scan.clone());
        Ok(())
    }

    async fn find_latest_by_domain(&self, domain: &str) -> Result<Option<ScanJob>, StoreError> {
        let mut matching: Vec<ScanJob> = self
            .all()
            .into_iter()
            .filter(|s| s.domain == domain)
            .collect();
        matching.sort_by(latest_first);
        Ok(matching.into_iter().next())
    }

    async fn find_by_domain_and_status(
        &self,
        domain: &str,
        status: ScanStatus,
    ) -> Result<Option<ScanJob>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .find(|s| s.domain == domain && s.status == status))
    }

    async fn list_by_status_oldest_first(
        &self,
        status: ScanStatus,
        limit: usize,
    ) -> Result<Vec<ScanJob>, StoreError> {
        let mut matching: Vec<ScanJob> = self
            .all()
            .into_iter()
            .filter(|s| s.status == status)
            .collect();
        matching.sort_by_key(|s| s.created_at);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<ScanJob>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|s| s.status == status)
            .collect())
    }

    async fn update(&self, scan: &ScanJob) -> Result<(), StoreError> {
        if self.failing_domains.lock().unwrap().contains(&scan.domain) {
            return Err(StoreError::backend(std::io::Error::other("scripted failure")));
        }
        let mut scans = self.scans.lock().unwrap();
        match scans.iter_mut().find(|s| s.id == scan.id) {
            Some(slot) => {
                *slot = scan.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt {
                id: scan.id.to_string(),
                reason: "no such scan".into(),
            }),
        }
    }

    async fn list_page(
        &self,
        page_index: u32,
        page_size: u32,
    ) -> Result<Page<ScanJob>, StoreError> {
        let mut all = self.all();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page_index as usize * page_size as usize)
            .take(page_size as usize)
            .collect();

        Ok(Page {
            items,
            page_index,
            page_size,
            total,
        })
    }
}

// ---------------------------------------------------------------------------
// Scripted worker runtime
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeState {
    health: HashMap<String, WorkerHealth>,
    output: HashMap<String, String>,
    live_workers: usize,
    fail_count: bool,
    fail_destroy: bool,
    fail_start: bool,
    started: Vec<(String, ScanId)>,
    destroyed: Vec<String>,
}

/// [`WorkerRuntime`] whose answers are set by the test. Workers with no
/// scripted health report `NotExist`.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn set_health(&self, scan: &ScanJob, health: WorkerHealth) {
        let worker = WorkerRef::for_scan(scan.id, &scan.domain);
        self.state
            .lock()
            .unwrap()
            .health
            .insert(worker.as_str().to_string(), health);
    }

    pub fn set_output(&self, scan: &ScanJob, output: &str) {
        let worker = WorkerRef::for_scan(scan.id, &scan.domain);
        self.state
            .lock()
            .unwrap()
            .output
            .insert(worker.as_str().to_string(), output.to_string());
    }

    pub fn set_live_workers(&self, n: usize) {
        self.state.lock().unwrap().live_workers = n;
    }

    pub fn fail_count(&self, fail: bool) {
        self.state.lock().unwrap().fail_count = fail;
    }

    pub fn fail_destroy(&self, fail: bool) {
        self.state.lock().unwrap().fail_destroy = fail;
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.lock().unwrap().fail_start = fail;
    }

    pub fn started(&self) -> Vec<(String, ScanId)> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.state.lock().unwrap().destroyed.clone()
    }

    /// Wait until `n` start requests have arrived. Launch hands them to
    /// spawned tasks, so they land shortly after `launch` returns.
    pub async fn wait_for_starts(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.started().len() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("worker starts arrived");
    }
}

fn scripted_failure(command: &'static str) -> RuntimeError {
    RuntimeError::CommandFailed {
        command,
        code: Some(1),
        stderr: "scripted failure".into(),
    }
}

#[async_trait]
impl WorkerRuntime for FakeRuntime {
    async fn start_worker(&self, domain: &str, scan_id: ScanId) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.started.push((domain.to_string(), scan_id));
        if state.fail_start {
            return Err(scripted_failure("run"));
        }
        Ok(())
    }

    async fn inspect_health(&self, worker: &WorkerRef) -> WorkerHealth {
        self.state
            .lock()
            .unwrap()
            .health
            .get(worker.as_str())
            .copied()
            .unwrap_or(WorkerHealth::NotExist)
    }

    async fn extract_output(&self, worker: &WorkerRef) -> String {
        self.state
            .lock()
            .unwrap()
            .output
            .get(worker.as_str())
            .cloned()
            .unwrap_or_default()
    }

    async fn destroy_worker(&self, worker: &WorkerRef) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.destroyed.push(worker.as_str().to_string());
        if state.fail_destroy {
            return Err(scripted_failure("rm"));
        }
        Ok(())
    }

    async fn count_live_workers(&self) -> Result<usize, RuntimeError> {
        let state = self.state.lock().unwrap();
        if state.fail_count {
            return Err(scripted_failure("ps"));
        }
        Ok(state.live_workers)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub runtime: Arc<FakeRuntime>,
    pub service: Arc<ScanService>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let runtime = Arc::new(FakeRuntime::default());
    let service = Arc::new(ScanService::new(store.clone(), runtime.clone()));
    Harness {
        store,
        runtime,
        service,
    }
}

impl Harness {
    pub fn dispatcher(&self, max_active_workers: usize) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.service),
            self.runtime.clone(),
            max_active_workers,
        )
    }

    pub fn monitor(&self, max_active_workers: usize) -> Monitor {
        Monitor::new(
            Arc::clone(&self.service),
            self.runtime.clone(),
            self.dispatcher(max_active_workers),
            Arc::new(MarkerClassifier::default()),
            Duration::from_secs(60),
        )
    }
}

/// Now, shifted by whole minutes (negative for the past).
pub fn minutes_from_now(minutes: i64) -> Timestamp {
    Utc::now() + chrono::Duration::minutes(minutes)
}
