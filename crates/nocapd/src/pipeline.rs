//! The verification pipeline behind `POST /prediction`.
//!
//! input -> (scrape if URL) -> style classification -> evidence search
//! -> fact check -> composition. Only undecodable bodies, scrape failures
//! and empty titles are client errors; everything downstream degrades into
//! the response body.

use crate::classifier::StylisticClassifier;
use crate::composer::ResponseComposer;
use crate::factcheck::FactChecker;
use crate::metrics::NocapMetrics;
use crate::normalize::normalize_item;
use crate::quota::QuotaTracker;
use crate::scrape::{is_url, PageFetcher, ScrapeError};
use crate::search::EvidenceRetriever;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nocap_shared::{ErrorResponse, PredictionRequest, PredictionResponse};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Scrape failed")]
    Scrape(#[from] ScrapeError),

    #[error("Title is required")]
    EmptyTitle,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Prediction failed")]
    Aborted,
}

impl From<JsonRejection> for PipelineError {
    fn from(rejection: JsonRejection) -> Self {
        PipelineError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match self {
            PipelineError::Aborted => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// A request after URL expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub title: String,
    pub text: String,
    pub source_is_url: bool,
}

pub struct VerificationPipeline {
    fetcher: Arc<dyn PageFetcher>,
    classifier: Arc<StylisticClassifier>,
    retriever: EvidenceRetriever,
    fact_checker: FactChecker,
    composer: ResponseComposer,
    quota: Arc<QuotaTracker>,
    metrics: Option<Arc<NocapMetrics>>,
}

impl VerificationPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        classifier: Arc<StylisticClassifier>,
        retriever: EvidenceRetriever,
        fact_checker: FactChecker,
        composer: ResponseComposer,
        quota: Arc<QuotaTracker>,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            retriever,
            fact_checker,
            composer,
            quota,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NocapMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Expand a raw request: URL titles are scraped into title and body.
    pub async fn prepare(&self, request: PredictionRequest) -> Result<VerificationRequest, PipelineError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(PipelineError::EmptyTitle);
        }

        if !is_url(title) {
            return Ok(VerificationRequest {
                title: title.to_string(),
                text: request.text.unwrap_or_default(),
                source_is_url: false,
            });
        }

        match self.fetcher.fetch(title).await {
            Ok(page) => {
                info!("Scraped '{}' from {}", page.title, title);
                Ok(VerificationRequest {
                    title: page.title,
                    text: page.text,
                    source_is_url: true,
                })
            }
            Err(e) => {
                warn!("Scrape of {} failed: {}", title, e);
                if let Some(ref metrics) = self.metrics {
                    metrics.record_scrape_failure();
                }
                Err(PipelineError::Scrape(e))
            }
        }
    }

    pub async fn verify(&self, request: PredictionRequest) -> Result<PredictionResponse, PipelineError> {
        let span = info_span!("prediction", request_id = %Uuid::new_v4());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: PredictionRequest) -> Result<PredictionResponse, PipelineError> {
        let served = self.quota.record_request();
        info!("Request #{} received", served);

        let request = self.prepare(request).await?;

        let style = self
            .classifier
            .classify(&normalize_item(&request.title, &request.text));
        let evidence = self.retriever.search(&request.title).await;
        let fact_check = self
            .fact_checker
            .analyze(&request.title, &request.text, &evidence)
            .await;

        let response = self.composer.compose(fact_check, style);
        info!(
            "Verdict {} ({}%) via {}, style {}",
            response.verdict, response.confidence, response.method, response.style_analysis
        );
        if let Some(ref metrics) = self.metrics {
            metrics.record_prediction(response.method.as_str());
        }

        Ok(response)
    }
}
