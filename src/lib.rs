//! Live polls: users create polls, cast votes, and every connected observer
//! receives the updated tally as soon as a vote is accepted.
//!
//! # Layout
//! - [`db`]: the `DurableStore` trait with MongoDB and in-memory backends.
//! - [`services`]: vote ledger, tally aggregator, subscriber registry and
//!   broadcast fan-out.
//! - [`controllers`] / [`routes`]: the axum HTTP, WebSocket and SSE surface.
//!
//! # Running
//! ```sh
//! MONGO_URI=mongodb://localhost:27017 cargo run
//! STORE_BACKEND=memory RUST_LOG=pollcast=debug cargo run
//! ```

use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::{extract::State, http::HeaderValue, response::Json, routing::get, Router};
use once_cell::sync::Lazy;
use serde_json::json;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod controllers;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use state::AppState;
use utils::config::Config;
use utils::error::{AppError, AppResult};

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/", get(root))
        .nest("/users", routes::user_routes::user_routes())
        .nest("/polls", routes::poll_routes::poll_routes())
        .nest("/vote", routes::vote_routes::vote_routes())
        .nest("/ws", routes::live_routes::live_routes())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origin.map(|origin| (origin, origin.parse::<HeaderValue>())) {
        Some((_, Ok(origin))) => layer.allow_origin(origin),
        Some((raw, Err(_))) => {
            warn!("Failed to parse CORS origin {raw}, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

pub async fn start_server() -> AppResult<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    Lazy::force(&START_TIME);

    info!("Loading configuration...");
    let config = Config::load()?;

    info!(backend = ?config.store_backend, "Initializing store...");
    let store = db::connection::init_store(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(store, config);
    let router = app(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to bind to address {}: {}", addr, e)))?;
    info!("Server is running on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::InternalError(format!("Server error: {}", e)))?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Health check: uptime plus the number of connected tally observers.
async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let uptime = START_TIME.elapsed();

    Json(json!({
        "status": "ok",
        "uptimeSeconds": uptime.as_secs(),
        "subscribers": state.registry.len(),
        "message": format!("pollcast up for {}", format_uptime(uptime)),
    }))
}

/// Renders `1d 2h 3m 4s`, omitting leading zero units.
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let units = [(secs / 86_400, 'd'), (secs / 3_600 % 24, 'h'), (secs / 60 % 60, 'm')];

    let mut rendered: String = units
        .iter()
        .skip_while(|(value, _)| *value == 0)
        .map(|(value, unit)| format!("{value}{unit} "))
        .collect();
    rendered.push_str(&format!("{}s", secs % 60));
    rendered
}
