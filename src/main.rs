//! volcanic-lightning-monitor entry point.
//!
//! Starts the polling scheduler, the expiry sweeper and the Axum server
//! with REST and WebSocket endpoints, then shuts all of them down on
//! Ctrl-C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use volcanic_lightning_monitor::api;
use volcanic_lightning_monitor::app_state::AppState;
use volcanic_lightning_monitor::config::MonitorConfig;
use volcanic_lightning_monitor::domain::Broadcaster;
use volcanic_lightning_monitor::persistence::{MemoryStore, PostgresStore, SnapshotStore};
use volcanic_lightning_monitor::report::HttpReportFetcher;
use volcanic_lightning_monitor::service::{Pipeline, RetryPolicy, Scheduler, spawn_expiry_sweeper};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = MonitorConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        "starting volcanic-lightning-monitor"
    );

    // Build persistence layer
    let store: Arc<dyn SnapshotStore> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config).await?;
        store.ensure_schema().await?;
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled, history is kept in memory only");
        Arc::new(MemoryStore::new())
    };

    // Build pipeline
    let broadcaster = Broadcaster::new(config.broadcast_capacity);
    let source = Arc::new(HttpReportFetcher::new(
        config.report_url.clone(),
        config.fetch_timeout(),
    )?);
    tracing::info!(
        report_url = source.url(),
        poll_interval_secs = config.poll_interval_secs,
        "report source configured"
    );
    let retry = RetryPolicy {
        max_retries: config.max_retries,
        backoff: Duration::from_millis(config.retry_backoff_ms),
    };
    let pipeline = Arc::new(Pipeline::new(
        source,
        broadcaster.clone(),
        Arc::clone(&store),
        retry,
    ));

    // Start background tasks
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let scheduler = Scheduler::new(pipeline, config.poll_interval());
    let scheduler_handle = tokio::spawn(scheduler.run(async move {
        let _ = stop_rx.changed().await;
    }));
    let sweeper_handle = spawn_expiry_sweeper(Arc::clone(&store), config.expiry_sweep_interval());

    // Build application
    let app = api::build_app(AppState { broadcaster, store });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background tasks
    let _ = stop_tx.send(true);
    match scheduler_handle.await {
        Ok(stats) => tracing::info!(
            completed = stats.completed,
            failed = stats.failed,
            persist_failures = stats.persist_failures,
            dropped_ticks = stats.dropped_ticks,
            "scheduler finished"
        ),
        Err(err) => tracing::error!(error = %err, "scheduler task failed"),
    }
    sweeper_handle.abort();

    tracing::info!("shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
