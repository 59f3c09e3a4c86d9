use clap::Parser;
use relay_hub::{metrics, rest, tasks};
use relay_hub::{ApplianceStateStore, Config, HttpRelayClient, SettingsFile};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SERVER_TASK: &str = "HTTP server";
const DRIFT_TASK: &str = "metrics drift";
const SWEEP_TASK: &str = "timer sweep";

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting relay hub");
    info!("HTTP server: {}", config.http_addr);
    info!("Settings file: {}", config.settings_path.display());

    if let Err(e) = metrics::init_metrics() {
        error!("Failed to register metrics: {}", e);
        std::process::exit(1);
    }

    let store = ApplianceStateStore::new(
        config.store_config(),
        Arc::new(HttpRelayClient::new().with_port(config.device_port)),
        Arc::new(SettingsFile::new(&config.settings_path)),
    )
    .into_shared();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut drift_handle = tokio::spawn(tasks::run_metrics_drift(
        store.clone(),
        config.metrics_interval(),
        shutdown_rx.clone(),
    ));
    let mut sweep_handle = tokio::spawn(tasks::run_sweeper(
        store.clone(),
        config.timer_sweep_interval(),
        shutdown_rx.clone(),
    ));

    let app = rest::create_router(store);

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    let mut server_shutdown = shutdown_rx;
    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
            .unwrap_or_else(|e| {
                error!("HTTP server error: {}", e);
            });
    });

    let finished = tokio::select! {
        _ = &mut server_handle => {
            error!("HTTP server terminated");
            Some(SERVER_TASK)
        }
        result = &mut drift_handle => {
            report_exit(DRIFT_TASK, result);
            Some(DRIFT_TASK)
        }
        result = &mut sweep_handle => {
            report_exit(SWEEP_TASK, result);
            Some(SWEEP_TASK)
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            None
        }
    };

    // Stop background loops before exiting so no callback outlives the store
    let _ = shutdown_tx.send(true);
    for (name, handle) in [
        (SERVER_TASK, server_handle),
        (DRIFT_TASK, drift_handle),
        (SWEEP_TASK, sweep_handle),
    ] {
        if finished == Some(name) {
            continue;
        }
        if let Err(e) = handle.await {
            error!("{} task failed: {}", name, e);
        }
    }

    info!("Shutting down");
}

fn report_exit(name: &str, result: Result<(), JoinError>) {
    match result {
        Ok(()) => error!("{} task terminated", name),
        Err(e) => error!("{} task failed: {}", name, e),
    }
}
