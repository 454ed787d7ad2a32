//! Presentation Layer
//!
//! Axum router serving the HTML dashboard, the JSON account API, the public
//! count endpoint and the health and metrics probes.

pub mod api;
pub mod count;
pub mod dashboard;
pub mod error;

use anyhow::{Context, Result};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::accounts::AccountService;
use crate::identity::RequestContext;
use crate::metrics;

pub use error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AccountService>,
    pub session_cookie: Arc<str>,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(service: Arc<AccountService>, session_cookie: &str) -> Self {
        Self {
            service,
            session_cookie: Arc::from(session_cookie),
            metrics_enabled: true,
        }
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}

/// Caller credentials pulled from the request headers
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Caller(RequestContext::from_headers(
            &parts.headers,
            &state.session_cookie,
        )))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/dashboard", get(dashboard::show))
        .route("/dashboard/accounts", post(dashboard::add))
        .route("/dashboard/accounts/delete", post(dashboard::delete))
        .route("/api/accounts", get(api::list).post(api::create))
        .route("/api/accounts/{id}", axum::routing::delete(api::delete))
        .route(
            "/api/users/{principal_id}/accounts/count",
            get(count::account_count),
        )
        .route("/health", get(health_handler));

    if state.metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serve `app` on `addr` until Ctrl-C
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Metrics endpoint handler
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error gathering metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}
