//! Row-level security demo HTTP server
//!
//! Main entry point for the HTTP API server.

use std::time::Duration;

use anyhow::Context;
use infrastructure::{AppConfig, AsyncDatabase, SecurityValidator, init_telemetry};
use presentation_http::{routes, set_expose_internal_errors, state::AppState};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.telemetry, config.server.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "RLS demo server starting"
    );

    let warnings = SecurityValidator::validate(&config);
    SecurityValidator::log_warnings(&warnings);
    if SecurityValidator::should_block_startup(&config, &warnings) {
        anyhow::bail!("Refusing to start with critical security warnings");
    }
    set_expose_internal_errors(!config.is_production());

    let db = AsyncDatabase::open(&config.database)
        .await
        .with_context(|| format!("Failed to open database '{}'", config.database.path))?;
    info!(path = %config.database.path, "Database ready");

    let addr = config.server.bind_address();
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let app = routes::create_router(AppState::from_database(&db, config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Server listening");
    info!("API docs: http://{addr}/swagger-ui");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        error!(error = %e, "Server error");
    }

    if tokio::time::timeout(shutdown_timeout, db.close()).await.is_err() {
        warn!(?shutdown_timeout, "Database pool did not close in time");
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
