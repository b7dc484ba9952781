//! Docker CLI implementation of the worker runtime.

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use recon_core::runtime::{RuntimeError, WorkerRuntime, OUTPUT_UNAVAILABLE};
use recon_core::types::ScanId;
use recon_core::worker::{WorkerHealth, WorkerRef};
use tokio::process::Command;

use crate::command;

/// Default scanner image.
pub const DEFAULT_IMAGE: &str = "caffix/amass";

/// Bound on `docker run -d`, `docker logs`, and `docker ps`.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on `docker inspect`.
const DEFAULT_INSPECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on `docker rm -f`.
const DEFAULT_DESTROY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Path or name of the Docker CLI binary.
    pub docker_bin: String,
    /// Scanner image every worker runs.
    pub image: String,
    pub command_timeout: Duration,
    pub inspect_timeout: Duration,
    pub destroy_timeout: Duration,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".into(),
            image: DEFAULT_IMAGE.into(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            inspect_timeout: DEFAULT_INSPECT_TIMEOUT,
            destroy_timeout: DEFAULT_DESTROY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DockerRuntime {
    config: DockerConfig,
}

impl DockerRuntime {
    pub fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    /// Run a docker subcommand to completion within `limit`.
    ///
    /// The child is killed if the deadline passes, since dropping the
    /// `output()` future drops the child with `kill_on_drop` set.
    async fn exec(
        &self,
        command: &'static str,
        args: Vec<String>,
        limit: Duration,
    ) -> Result<Output, RuntimeError> {
        let mut cmd = Command::new(&self.config.docker_bin);
        cmd.args(&args).kill_on_drop(true);

        match tokio::time::timeout(limit, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(RuntimeError::Spawn { command, source }),
            Err(_) => Err(RuntimeError::Timeout {
                command,
                secs: limit.as_secs(),
            }),
        }
    }

    /// Like [`exec`](Self::exec) but treats a non-zero exit as an error.
    async fn exec_checked(
        &self,
        command: &'static str,
        args: Vec<String>,
        limit: Duration,
    ) -> Result<Output, RuntimeError> {
        let output = self.exec(command, args, limit).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(RuntimeError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl WorkerRuntime for DockerRuntime {
    async fn start_worker(&self, domain: &str, scan_id: ScanId) -> Result<(), RuntimeError> {
        let worker = WorkerRef::for_scan(scan_id, domain);
        let args = command::run_args(&self.config.image, &worker, scan_id, domain);

        self.exec_checked("docker run", args, self.config.command_timeout)
            .await?;

        tracing::info!(worker = %worker, image = %self.config.image, "Started scan container");
        Ok(())
    }

    async fn inspect_health(&self, worker: &WorkerRef) -> WorkerHealth {
        let output = match self
            .exec(
                "docker inspect",
                command::inspect_args(worker),
                self.config.inspect_timeout,
            )
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(worker = %worker, error = %e, "Container inspection failed");
                return WorkerHealth::Unknown;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let (health, unexpected) = command::parse_inspect(&stdout, &stderr);

        if let Some(status) = unexpected {
            tracing::warn!(
                worker = %worker,
                status = %status,
                stderr = %stderr.trim(),
                "Container status check returned unexpected output",
            );
        }
        health
    }

    async fn extract_output(&self, worker: &WorkerRef) -> String {
        match self
            .exec_checked(
                "docker logs",
                command::logs_args(worker),
                self.config.command_timeout,
            )
            .await
        {
            Ok(output) => command::merge_output(&output.stdout, &output.stderr),
            Err(e) => {
                tracing::error!(worker = %worker, error = %e, "Failed to read container logs");
                OUTPUT_UNAVAILABLE.to_string()
            }
        }
    }

    async fn destroy_worker(&self, worker: &WorkerRef) -> Result<(), RuntimeError> {
        self.exec_checked(
            "docker rm",
            command::remove_args(worker),
            self.config.destroy_timeout,
        )
        .await?;
        tracing::info!(worker = %worker, "Removed scan container");
        Ok(())
    }

    async fn count_live_workers(&self) -> Result<usize, RuntimeError> {
        let output = self
            .exec_checked(
                "docker ps",
                command::list_owned_args(),
                self.config.command_timeout,
            )
            .await?;
        let count = command::count_ids(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(count, "Counted live scan containers");
        Ok(count)
    }
}
