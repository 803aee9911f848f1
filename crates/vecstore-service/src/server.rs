//! HTTP server setup.
//!
//! Builds the axum router and serves it, optionally until a shutdown future
//! resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use vecstore_index::VectorStore;

use crate::handlers::{add, health, search, status, AppState};

/// Create the application router with all routes and middleware.
pub fn create_router(store: Arc<VectorStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/add", post(add))
        .route("/search", post(search))
        .with_state(AppState::new(store))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until the process is stopped.
pub async fn run_server(
    addr: SocketAddr,
    store: Arc<VectorStore>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    run_server_with_shutdown(addr, store, std::future::pending()).await
}

/// Bind `addr` and serve until `shutdown_signal` resolves.
pub async fn run_server_with_shutdown<F>(
    addr: SocketAddr,
    store: Arc<VectorStore>,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Starting HTTP server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    serve_with_shutdown(listener, store, shutdown_signal).await
}

/// Serve on an already-bound listener until `shutdown_signal` resolves.
///
/// Tests bind port 0 themselves and pass the listener in.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    store: Arc<VectorStore>,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(store);
    info!(addr = %listener.local_addr()?, "HTTP server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}
