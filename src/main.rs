//! `cotune-server`: the co-listening relay.
//!
//! Reads configuration, starts the realtime engine behind axum, and on
//! SIGINT/SIGTERM closes every socket and waits for their teardown.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use cotune_api::{AppState, build_app};
use cotune_core::config::{AppConfig, LogFormat, LoggingConfig};
use cotune_core::error::{AppError, ErrorKind};
use cotune_realtime::RealtimeEngine;

const DRAIN_POLL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() {
    let config_dir = std::env::var("COTUNE_CONFIG_DIR").unwrap_or_else(|_| "config".into());
    let env = std::env::var("COTUNE_ENV").unwrap_or_else(|_| "development".into());

    let config = match AppConfig::load(&config_dir, &env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cotune-server: cannot load configuration from {config_dir}: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);
    tracing::debug!(config_dir = %config_dir, env = %env, "Configuration loaded");

    if let Err(e) = serve(Arc::new(config)).await {
        tracing::error!(error = %e, "cotune-server stopped with an error");
        std::process::exit(1);
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = fmt().with_env_filter(filter).with_target(true);

    match logging.format {
        LogFormat::Json => builder.json().with_current_span(false).init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn serve(config: Arc<AppConfig>) -> Result<(), AppError> {
    let engine = Arc::new(RealtimeEngine::new(config.realtime.clone()));
    let app = build_app(AppState::new(config.clone(), engine.clone()));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Transport, format!("Cannot bind {addr}"), e)
    })?;
    tracing::info!(addr = %addr, version = env!("CARGO_PKG_VERSION"), "cotune-server listening");

    let on_shutdown = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!(
                connections = on_shutdown.registry.connection_count(),
                "Shutting down, closing connections"
            );
            on_shutdown.shutdown();
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Transport, "HTTP server failed", e))?;

    // Socket tasks outlive `serve`; their disconnect teardown still has to run.
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let drained = tokio::time::timeout(grace, async {
        while engine.registry.connection_count() > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            remaining = engine.registry.connection_count(),
            grace_seconds = config.server.shutdown_grace_seconds,
            "Connections still open after grace period"
        );
    }

    tracing::info!("cotune-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
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
