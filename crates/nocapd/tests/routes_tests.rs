//! HTTP route tests driving the axum router directly.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use nocap_shared::{
    AiState, CredentialStatus, ErrorResponse, HealthResponse, Label, PredictionResponse,
    SearchStatus,
};
use nocapd::classifier::StylisticClassifier;
use nocapd::composer::ResponseComposer;
use nocapd::credentials::CredentialPool;
use nocapd::diagnostics::{Diagnostics, FakeRateLimitProbe, RateLimitInfo};
use nocapd::factcheck::{FactChecker, FakeCompletionProvider, ModelParams, ProviderReply};
use nocapd::metrics::NocapMetrics;
use nocapd::pipeline::VerificationPipeline;
use nocapd::quota::QuotaTracker;
use nocapd::scrape::FakePageFetcher;
use nocapd::search::{EvidenceRetriever, FakeSearchProvider};
use nocapd::server::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const VERDICT_JSON: &str = r#"{"verdict": "FAKE", "confidence": 77, "explanation": "No credible source.", "sources": []}"#;

fn app(credentials: &[&str]) -> Router {
    let completion =
        FakeCompletionProvider::always(ProviderReply::ok(VERDICT_JSON).with_remaining("99"));
    app_with(credentials, completion).0
}

fn app_with(credentials: &[&str], completion: FakeCompletionProvider) -> (Router, Arc<QuotaTracker>) {
    let quota = Arc::new(QuotaTracker::new(2455));
    let pool = Arc::new(CredentialPool::new(
        credentials.iter().map(|s| s.to_string()).collect(),
        150,
        quota.clone(),
    ));

    let metrics = Arc::new(NocapMetrics::new().unwrap());
    let retriever = EvidenceRetriever::new(
        Arc::new(FakeSearchProvider::always(Vec::new())),
        quota.clone(),
        3,
        Duration::from_millis(200),
    )
    .with_metrics(metrics.clone());
    let fact_checker = FactChecker::new(
        pool.clone(),
        Arc::new(completion),
        ModelParams::default(),
        Duration::from_millis(200),
    );
    let pipeline = VerificationPipeline::new(
        Arc::new(FakePageFetcher::new()),
        Arc::new(StylisticClassifier::unavailable()),
        retriever,
        fact_checker,
        ResponseComposer::new(50, Label::Real),
        quota.clone(),
    )
    .with_metrics(metrics.clone());

    let probe = credentials.iter().fold(FakeRateLimitProbe::new(), |probe, secret| {
        probe.with_answer(
            secret,
            Ok(RateLimitInfo {
                status: 200,
                limit: Some(5000),
                remaining: Some(4321),
                reset: None,
            }),
        )
    });
    let diagnostics = Diagnostics::new(pool.clone(), Arc::new(probe), Duration::from_secs(2), true);

    let router = build_router(AppState::new_with_metrics(
        pipeline,
        pool,
        diagnostics,
        64 * 1024,
        metrics,
    ));
    (router, quota)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

#[tokio::test]
async fn test_prediction_returns_ai_verdict() {
    let response = app(&["secret-one"])
        .oneshot(post_json("/prediction", r#"{"title": "Moon landing faked"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: PredictionResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.verdict, Label::Fake);
    assert_eq!(body.confidence, 77);
    assert_eq!(body.api_remaining.as_deref(), Some("99"));
}

#[tokio::test]
async fn test_prediction_scrape_failure_is_400() {
    let response = app(&["secret-one"])
        .oneshot(post_json("/prediction", r#"{"title": "https://unknown.example/a"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.error, "Scrape failed");
}

#[tokio::test]
async fn test_prediction_empty_title_is_400() {
    let response = app(&["secret-one"])
        .oneshot(post_json("/prediction", r#"{"text": "body only"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_prediction_undecodable_body_is_json_400() {
    let response = app(&["secret-one"])
        .oneshot(post_json("/prediction", r#"{"title": 12}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body.error.starts_with("Invalid request body: "));

    let response = app(&["secret-one"])
        .oneshot(post_json("/prediction", "not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body.error.starts_with("Invalid request body: "));
}

/// Rotation keeps going after the client hangs up.
#[tokio::test]
async fn test_prediction_survives_client_disconnect() {
    let completion = FakeCompletionProvider::always(ProviderReply::status(429))
        .with_delay(Duration::from_millis(40));
    let (app, quota) = app_with(&["secret-a", "secret-b", "secret-c"], completion);

    let request = app.oneshot(post_json("/prediction", r#"{"title": "Anything"}"#));
    let abandoned = tokio::time::timeout(Duration::from_millis(10), request).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(quota.snapshot().ai_attempts, 3);
}

#[tokio::test]
async fn test_health_reports_credentials() {
    let response = app(&["a-secret", "b-secret"]).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.status, "healthy");
    assert_eq!(body.ai, AiState::Ready);
    assert_eq!(body.tokens_active, 2);

    let response = app(&[]).oneshot(get("/health")).await.unwrap();
    let body: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.ai, AiState::Offline);
}

#[tokio::test]
async fn test_limit_reports_every_credential() {
    let response = app(&["first-secret-1", "second-secret-2"])
        .oneshot(get("/limit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let tokens = json["github_tokens"].as_array().unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0]["token_index"], 1);
    assert_eq!(tokens[1]["token_snippet"], "...secret-2");
    assert_eq!(tokens[1]["rest_remaining"], 4321);

    let status: CredentialStatus = serde_json::from_value(tokens[0]["status"].clone()).unwrap();
    assert_eq!(status, CredentialStatus::Active);
    let search: SearchStatus = serde_json::from_value(json["serper_api"]["status"].clone()).unwrap();
    assert_eq!(search, SearchStatus::Active);
    assert_eq!(json["serper_api"]["remaining_credits"], 2455);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app(&["secret-one"]);
    let response = app
        .clone()
        .oneshot(post_json("/prediction", r#"{"title": "Anything"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("nocap_search_requests_total{result=\"empty\"} 1"));
    assert!(text.contains("nocap_predictions_total{method=\"AI_FACT_CHECK\"} 1"));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let huge = format!(r#"{{"title": "{}"}}"#, "x".repeat(128 * 1024));
    let request = Request::builder()
        .method("POST")
        .uri("/prediction")
        .header("content-type", "application/json")
        .header("content-length", huge.len())
        .body(Body::from(huge))
        .unwrap();
    let response = app(&["secret-one"]).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
