//! HTTP server for the metrics endpoint.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::registry::SharedRegistry;
use crate::scheduler::SchedulerStatus;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    registry: SharedRegistry,
    status: watch::Receiver<SchedulerStatus>,
}

/// Create the HTTP router.
fn create_router(
    registry: SharedRegistry,
    status: watch::Receiver<SchedulerStatus>,
    metrics_path: &str,
) -> Router {
    let state = AppState { registry, status };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/snapshot", get(snapshot_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.registry.render();

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint.
async fn ready_handler(State(state): State<AppState>) -> Response {
    if state.status.borrow().is_ready() {
        (StatusCode::OK, "ready\n").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready - no collection cycle completed yet\n",
        )
            .into_response()
    }
}

/// Handler for the /snapshot endpoint: every current point as JSON.
async fn snapshot_handler(State(state): State<AppState>) -> Response {
    Json(state.registry.snapshot()).into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    registry: SharedRegistry,
    status: watch::Receiver<SchedulerStatus>,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        registry: SharedRegistry,
        status: watch::Receiver<SchedulerStatus>,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Self {
        Self {
            registry,
            status,
            listen_addr,
            metrics_path,
        }
    }

    /// Bind the listener.
    ///
    /// Split from [`serve`](Self::serve) so a bind failure surfaces before
    /// any background task starts.
    pub async fn bind(self) -> anyhow::Result<BoundServer> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        Ok(BoundServer {
            listener,
            router: create_router(self.registry, self.status, &self.metrics_path),
            local_addr,
        })
    }

    /// Bind, then serve until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        self.bind().await?.serve(shutdown).await
    }
}

/// A server with its listener bound.
pub struct BoundServer {
    listener: tokio::net::TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl BoundServer {
    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests until the shutdown signal is received.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
