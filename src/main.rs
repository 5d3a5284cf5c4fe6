use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use aula::engine::Engine;
use aula::limits::DEFAULT_SWEEP_INTERVAL_SECS;
use aula::notify::LogSender;
use aula::store::MemoryStore;
use aula::sweeper;

/// Worker process hosting the reminder sweeper. Runs against the in-memory
/// store; a deployment wires a database-backed `EntityStore` here instead.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("AULA_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    aula::observability::init(metrics_port);

    let sweep_interval_secs: u64 = std::env::var("AULA_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(Engine::new(store));
    let sender = Arc::new(LogSender);

    info!("aula worker starting");
    info!("  sweep_interval: {sweep_interval_secs}s");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let shutdown = CancellationToken::new();
    let sweeper_handle = tokio::spawn(sweeper::run_sweeper(
        engine,
        sender,
        Duration::from_secs(sweep_interval_secs),
        shutdown.clone(),
    ));

    // Graceful shutdown: cancel the sweeper on SIGTERM/ctrl-c and wait for it.
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    shutdown.cancel();
    sweeper_handle.await?;
    info!("aula worker stopped");
    Ok(())
}
