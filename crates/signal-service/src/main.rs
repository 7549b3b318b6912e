//! Convox Signaling Service
//!
//! WebSocket signaling server for multi-party WebRTC meetings.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing
//! 3. Initialize Prometheus metrics recorder
//! 4. Spawn the signaling actor over an in-memory meeting store
//! 5. Bind the listener and serve HTTP, WebSocket, health and metrics routes
//! 6. Wait for shutdown signal, then drain connections

#![warn(clippy::pedantic)]

use signal_service::config::Config;
use signal_service::observability::{init_metrics_recorder, HealthState};
use signal_service::routes::{build_routes, AppState};
use signal_service::store::{InMemoryMeetingStore, MeetingStore};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing format depends on configuration, so load it first
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "signal_service=info,tower_http=info".into());
    let (json_layer, text_layer) = if config.log_json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    info!("Starting Signaling Service");
    info!(
        bind_address = %config.bind_address,
        allowed_origin = config.allowed_origin.as_deref().unwrap_or("*"),
        connection_buffer = config.connection_buffer,
        max_message_bytes = config.max_message_bytes,
        enforce_room_scope = config.enforce_room_scope,
        shutdown_grace_seconds = config.shutdown_grace.as_secs(),
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let health_state = Arc::new(HealthState::new());
    let root_token = CancellationToken::new();
    let store: Arc<dyn MeetingStore> = Arc::new(InMemoryMeetingStore::new());

    let bind_address = config.bind_address;
    let shutdown_grace = config.shutdown_grace;
    let (state, signaling_task) = AppState::spawn(config, store, root_token.clone());
    let app = build_routes(state, Arc::clone(&health_state), Some(prometheus_handle));

    // Bind listener BEFORE serving to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %bind_address, "Failed to bind listener");
            format!("Failed to bind to {bind_address}: {e}")
        })?;
    info!(addr = %bind_address, "Signaling service listening");

    health_state.set_ready();

    let shutdown_health = Arc::clone(&health_state);
    let shutdown_token = root_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Stop taking traffic, then close every socket
            shutdown_health.set_not_ready();
            shutdown_token.cancel();
        })
        .await?;

    root_token.cancel();
    if tokio::time::timeout(shutdown_grace, signaling_task)
        .await
        .is_err()
    {
        warn!(
            grace_seconds = shutdown_grace.as_secs(),
            "Signaling actor did not stop within grace period"
        );
    }

    info!("Signaling service shutdown complete");
    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
