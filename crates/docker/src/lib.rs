//! [`WorkerRuntime`](recon_core::runtime::WorkerRuntime) backed by the
//! Docker CLI.
//!
//! Each scan runs as a detached container named after its scan (see
//! [`WorkerRef::for_scan`](recon_core::worker::WorkerRef::for_scan)) and
//! labelled so [`DockerRuntime`] can count only the containers it owns.

pub mod command;
pub mod runtime;

pub use runtime::{DockerConfig, DockerRuntime};
