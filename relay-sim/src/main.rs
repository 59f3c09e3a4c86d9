mod board;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use board::RelayBoard;
use clap::Parser;
use rand::Rng;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Stand-in for the relay board firmware.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "relay-sim",
    about = "Fake relay board. Point relay-hub at it with DEVICE_ADDRESS=<ip> and DEVICE_PORT=<port>; the hub's address setting takes a bare IPv4 address, never host:port"
)]
struct Config {
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8081")]
    http_addr: String,

    #[arg(long, env = "RELAYS", default_value_t = 4)]
    relays: usize,

    /// Probability of answering a toggle with a server error
    #[arg(long, env = "FAILURE_RATE", default_value_t = 0.0)]
    failure_rate: f64,
}

#[derive(Clone)]
struct AppState {
    board: Arc<Mutex<RelayBoard>>,
    failure_rate: f64,
}

#[derive(Debug, Deserialize)]
struct ToggleQuery {
    r: usize,
}

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting relay board simulator");
    info!(
        "Relays: {}, failure rate: {:.2}",
        config.relays, config.failure_rate
    );

    let app = create_router(config.relays, config.failure_rate.clamp(0.0, 1.0));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("Listening on {}", config.http_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }
}

fn create_router(relays: usize, failure_rate: f64) -> Router {
    let state = AppState {
        board: Arc::new(Mutex::new(RelayBoard::new(relays))),
        failure_rate,
    };

    Router::new()
        .route("/toggle", get(toggle))
        .route("/status", get(status))
        .with_state(state)
}

async fn toggle(
    State(state): State<AppState>,
    Query(query): Query<ToggleQuery>,
) -> impl IntoResponse {
    if state.failure_rate > 0.0 && rand::thread_rng().gen_bool(state.failure_rate) {
        warn!("Injected failure for relay {}", query.r);
        return (StatusCode::INTERNAL_SERVER_ERROR, "FAIL".to_string());
    }

    let level = state
        .board
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .toggle(query.r);

    match level {
        Some(level) => {
            info!("Relay {} -> {}", query.r, if level { "HIGH" } else { "LOW" });
            (StatusCode::OK, format!("Relay {} {}", query.r, if level { "ON" } else { "OFF" }))
        }
        None => {
            warn!("Toggle for unknown relay {}", query.r);
            (StatusCode::NOT_FOUND, format!("No relay {}", query.r))
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<Vec<board::RelayStatus>> {
    let board = state.board.lock().unwrap_or_else(|p| p.into_inner());
    Json(board.status().to_vec())
}
