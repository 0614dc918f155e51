//! API routes for nocapd

use crate::pipeline::PipelineError;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use nocap_shared::{
    AiState, DiagnosticsReport, HealthResponse, PredictionRequest, PredictionResponse, VERSION,
};
use std::sync::Arc;
use tracing::{error, info};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Prediction Routes
// ============================================================================

pub fn prediction_routes() -> Router<AppStateArc> {
    Router::new().route("/prediction", post(predict))
}

async fn predict(
    State(state): State<AppStateArc>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, PipelineError> {
    let Json(req) = payload?;

    // Detached: a client that hangs up does not cut credential rotation short
    let pipeline = state.pipeline.clone();
    let response = tokio::spawn(async move { pipeline.verify(req).await })
        .await
        .map_err(|e| {
            error!("Prediction task failed: {}", e);
            PipelineError::Aborted
        })??;
    Ok(Json(response))
}

// ============================================================================
// Diagnostics Routes
// ============================================================================

pub fn limit_routes() -> Router<AppStateArc> {
    Router::new().route("/limit", get(limits))
}

async fn limits(State(state): State<AppStateArc>) -> Json<DiagnosticsReport> {
    let report = state.diagnostics.report().await;
    info!(
        "Limit check: {} credentials, {} search credits",
        report.credentials.len(),
        report.search.remaining_credits
    );
    Json(report)
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let tokens_active = state.pool.len();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        ai: if tokens_active > 0 {
            AiState::Ready
        } else {
            AiState::Offline
        },
        tokens_active,
        requests_processed: state.quota.requests_served(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Metrics Routes
// ============================================================================

pub fn metrics_routes() -> Router<AppStateArc> {
    Router::new().route("/metrics", get(metrics))
}

async fn metrics(State(state): State<AppStateArc>) -> impl IntoResponse {
    let Some(ref metrics) = state.metrics else {
        return (StatusCode::NOT_FOUND, "metrics disabled".to_string()).into_response();
    };

    match metrics.export() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to export metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
