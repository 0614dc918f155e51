//! HTTP server for nocapd

use crate::credentials::CredentialPool;
use crate::diagnostics::Diagnostics;
use crate::metrics::NocapMetrics;
use crate::pipeline::VerificationPipeline;
use crate::quota::QuotaTracker;
use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Arc<VerificationPipeline>,
    pub pool: Arc<CredentialPool>,
    pub quota: Arc<QuotaTracker>,
    pub diagnostics: Arc<Diagnostics>,
    pub metrics: Option<Arc<NocapMetrics>>,
    pub start_time: Instant,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        pipeline: VerificationPipeline,
        pool: Arc<CredentialPool>,
        diagnostics: Diagnostics,
        max_body_bytes: usize,
    ) -> Self {
        let quota = pool.quota().clone();
        Self {
            pipeline: Arc::new(pipeline),
            pool,
            quota,
            diagnostics: Arc::new(diagnostics),
            metrics: None,
            start_time: Instant::now(),
            max_body_bytes,
        }
    }

    pub fn new_with_metrics(
        pipeline: VerificationPipeline,
        pool: Arc<CredentialPool>,
        diagnostics: Diagnostics,
        max_body_bytes: usize,
        metrics: Arc<NocapMetrics>,
    ) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(pipeline, pool, diagnostics, max_body_bytes)
        }
    }
}

/// Build the router with all route groups and layers.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    let state = Arc::new(state);

    Router::new()
        .merge(routes::prediction_routes())
        .merge(routes::limit_routes())
        .merge(routes::health_routes())
        .merge(routes::metrics_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        // The web client is served from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down gracefully");
    }
}
