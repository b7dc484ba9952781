use std::str::FromStr;
use std::time::Duration;

use recon_docker::DockerConfig;

use crate::dispatcher::DEFAULT_MAX_ACTIVE_WORKERS;
use crate::monitor::DEFAULT_TICK_INTERVAL;
use crate::telemetry::LogFormat;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Orchestrator configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub database_url: String,
    /// Cap on concurrently live scan workers.
    pub max_active_workers: usize,
    /// Delay between monitor ticks.
    pub monitor_interval: Duration,
    pub docker: DockerConfig,
    pub log_format: LogFormat,
}

impl OrchestratorConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                 | Default        |
    /// |-------------------------|----------------|
    /// | `DATABASE_URL`          | required       |
    /// | `MAX_ACTIVE_WORKERS`    | `10`           |
    /// | `MONITOR_INTERVAL_SECS` | `60`           |
    /// | `SCANNER_IMAGE`         | `caffix/amass` |
    /// | `DOCKER_BIN`            | `docker`       |
    /// | `INSPECT_TIMEOUT_SECS`  | `10`           |
    /// | `DESTROY_TIMEOUT_SECS`  | `10`           |
    /// | `LOG_FORMAT`            | `text`         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_active_workers =
            parse_or(&lookup, "MAX_ACTIVE_WORKERS", DEFAULT_MAX_ACTIVE_WORKERS)?;

        let interval_secs = parse_or(&lookup, "MONITOR_INTERVAL_SECS", DEFAULT_TICK_INTERVAL.as_secs())?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "MONITOR_INTERVAL_SECS",
                value: "0".into(),
            });
        }

        let defaults = DockerConfig::default();
        let docker = DockerConfig {
            docker_bin: lookup("DOCKER_BIN").unwrap_or(defaults.docker_bin),
            image: lookup("SCANNER_IMAGE").unwrap_or(defaults.image),
            command_timeout: defaults.command_timeout,
            inspect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "INSPECT_TIMEOUT_SECS",
                defaults.inspect_timeout.as_secs(),
            )?),
            destroy_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DESTROY_TIMEOUT_SECS",
                defaults.destroy_timeout.as_secs(),
            )?),
        };

        let log_format = parse_or(&lookup, "LOG_FORMAT", LogFormat::Text)?;

        Ok(Self {
            database_url,
            max_active_workers,
            monitor_interval: Duration::from_secs(interval_secs),
            docker,
            log_format,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
