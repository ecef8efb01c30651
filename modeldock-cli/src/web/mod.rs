//! HTTP surface for the `serve` command.
//!
//! Routes are mounted at `/` and, when configured, nested again under a
//! base path so the UI works both directly and behind a reverse proxy that
//! forwards a prefix.
//!
//! # Architecture
//!
//! ```text
//! axum Router ──► routes::* ──► ModelDockApp ──► TransferSupervisor
//!      │                                      └─► catalog (spawn_blocking)
//!      └─► events::status_events ◄── StatusStore (watch)
//! ```

mod events;
mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use modeldock::app::ModelDockApp;

use crate::error::CliError;

/// Shared handler state.
pub type AppState = Arc<ModelDockApp>;

/// Build the router, optionally duplicated under `base_path`.
pub fn router(app: AppState, base_path: &str) -> Router {
    let mut router = routes::routes();
    if !base_path.is_empty() {
        router = router.clone().nest(base_path, router);
    }
    router
        .layer(middleware::from_fn(log_request))
        .with_state(app)
}

/// Serve until Ctrl+C.
pub async fn serve(app: AppState, bind: &str, base_path: &str) -> Result<(), CliError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| CliError::Serve(format!("Failed to bind {}: {}", bind, e)))?;
    info!(bind, base_path, "HTTP server listening");

    axum::serve(listener, router(app, base_path))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Serve(e.to_string()))?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "HTTP request"
    );
    response
}
