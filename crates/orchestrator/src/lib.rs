//! Scan orchestration engine.
//!
//! Wires the submission path, the per-domain lock table, the admission
//! controlled dispatcher, and the polling monitor on top of the
//! [`ScanStore`](recon_core::store::ScanStore) and
//! [`WorkerRuntime`](recon_core::runtime::WorkerRuntime) seams.

pub mod config;
pub mod dispatcher;
pub mod lock;
pub mod monitor;
pub mod service;
pub mod telemetry;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use lock::DomainLocks;
pub use monitor::{Monitor, MonitorExit, TickReport};
pub use service::ScanService;
