use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use recon_core::classify::MarkerClassifier;
use recon_core::runtime::WorkerRuntime;
use recon_db::PgScanStore;
use recon_docker::DockerRuntime;
use recon_orchestrator::config::OrchestratorConfig;
use recon_orchestrator::monitor::supervise;
use recon_orchestrator::{telemetry, Dispatcher, Monitor, ScanService};
use tokio_util::sync::CancellationToken;

/// How long to wait for an in-flight tick to finish on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = OrchestratorConfig::from_env().context("Invalid configuration")?;

    // --- Tracing ---
    telemetry::init_tracing(config.log_format);
    tracing::info!(
        max_active_workers = config.max_active_workers,
        interval_secs = config.monitor_interval.as_secs(),
        image = %config.docker.image,
        "Loaded orchestrator configuration",
    );

    // --- Database ---
    let pool = recon_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    recon_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    recon_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Engine ---
    let store = Arc::new(PgScanStore::new(pool));
    let runtime: Arc<dyn WorkerRuntime> = Arc::new(DockerRuntime::new(config.docker.clone()));
    let service = Arc::new(ScanService::new(store, Arc::clone(&runtime)));
    let dispatcher = Dispatcher::new(
        Arc::clone(&service),
        Arc::clone(&runtime),
        config.max_active_workers,
    );
    let monitor = Monitor::new(
        service,
        runtime,
        dispatcher,
        Arc::new(MarkerClassifier::default()),
        config.monitor_interval,
    );

    let cancel = CancellationToken::new();
    let monitor_handle = tokio::spawn(monitor.run(cancel.clone()));

    supervise(monitor_handle, cancel, shutdown_signal(), SHUTDOWN_GRACE)
        .await
        .context("Scan monitor stopped unexpectedly")?;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
