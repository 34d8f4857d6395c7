use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use authguard::{config::Config, handlers, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // JSON logs, level via env filter
    init_tracing();

    tracing::info!("authguard starting...");

    let config = Config::load().map_err(|e| {
        tracing::error!(error = ?e, "failed to load configuration");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(host = %config.host, port = %config.port, "configuration loaded");

    // Build the bind address before config is moved
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to parse bind address");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "database connection failed");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    tracing::info!("database connected");

    sqlx::migrate!().run(&db_pool).await.map_err(|e| {
        tracing::error!(error = ?e, "migrations failed");
        anyhow::anyhow!("Failed to run migrations: {}", e)
    })?;

    let state = AppState::new(db_pool, config).map_err(|e| {
        tracing::error!(error = ?e, "failed to build AppState");
        anyhow::anyhow!("Failed to create AppState: {}", e)
    })?;

    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "failed to bind port");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "server error");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    tracing::info!("server stopped");

    Ok(())
}

/// tracing initialization (JSON output)
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,authguard=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Router construction
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/login/2fa", post(handlers::complete_two_factor_login))
        .route("/api/2fa/enable", post(handlers::enable_two_factor))
        .route("/api/2fa/disable", post(handlers::disable_two_factor))
        .route("/api/2fa/status", get(handlers::two_factor_status))
        .route("/api/token/refresh", post(handlers::refresh))
        .route("/api/me", get(handlers::me))
        .with_state(state)
}

/// Wait for a graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}
