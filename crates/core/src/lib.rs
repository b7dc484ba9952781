//! Domain types and pure logic for the recon scan orchestrator.
//!
//! This crate has no I/O of its own. It defines the scan job model, the
//! domain normalizer, output classification, worker naming, and the two
//! collaborator seams ([`store::ScanStore`] and [`runtime::WorkerRuntime`])
//! that the persistence and container adapters implement.

pub mod classify;
pub mod domain;
pub mod error;
pub mod runtime;
pub mod scan;
pub mod store;
pub mod types;
pub mod worker;
