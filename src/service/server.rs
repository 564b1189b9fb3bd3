use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use super::api::{self, AppState, SharedState};
use super::auth::{DEFAULT_PBKDF2_ITERATIONS, TokenSigner};
use super::db::{BoardDb, DbHandle};
use crate::config::ServerSettings;

/// Configuration for the board server.
pub struct ServerConfig {
    pub port: u16,
    pub db_path: std::path::PathBuf,
    pub secret_key: String,
    pub token_ttl_hours: i64,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerSettings::default().into()
    }
}

impl From<ServerSettings> for ServerConfig {
    fn from(settings: ServerSettings) -> Self {
        Self {
            port: settings.port,
            db_path: settings.db_path,
            secret_key: settings.secret_key,
            token_ttl_hours: settings.token_ttl_hours,
            dev_mode: false,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: SharedState, dev_mode: bool) -> Router {
    let app = api::api_router().with_state(state);
    if dev_mode {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Open the database and assemble shared state.
pub fn build_state(config: &ServerConfig) -> Result<SharedState> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = BoardDb::new(&config.db_path).context("Failed to initialize board database")?;
    Ok(Arc::new(AppState {
        db: DbHandle::new(db),
        signer: TokenSigner::new(&config.secret_key, config.token_ttl_hours),
        password_iterations: DEFAULT_PBKDF2_ITERATIONS,
    }))
}

/// Serve `router` on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

/// Start the board server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let state = build_state(&config)?;
    let app = build_router(state, config.dev_mode);

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr: SocketAddr = listener.local_addr()?;
    tracing::info!(%local_addr, db = %config.db_path.display(), "board server listening");
    println!("Quickboard running at http://{}", local_addr);

    serve(listener, app, shutdown_signal()).await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
