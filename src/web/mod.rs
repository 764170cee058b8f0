//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::scheduler::Scheduler;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

/// Web server exposing the harness operations.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, scheduler: Arc<Scheduler>) -> Self {
        Self {
            config,
            state: AppState { scheduler },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        router(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        // Targets
        .route("/api/targets", get(handlers::handle_get_targets))
        .route("/api/targets/refresh", post(handlers::handle_refresh_targets))
        // Probes
        .route("/api/probes", get(handlers::handle_get_probes))
        .route("/api/probes/{target}/{name}/run", post(handlers::handle_run_probe))
        // Runs
        .route("/api/state", get(handlers::handle_get_state))
        .route("/api/scope", put(handlers::handle_select_scope))
        .route("/api/runs", post(handlers::handle_start_run))
        .route("/api/runs/abort", post(handlers::handle_abort_run))
        // Results
        .route(
            "/api/results",
            get(handlers::handle_get_results).delete(handlers::handle_clear_results),
        )
        .route("/api/summary", get(handlers::handle_get_summary))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}
