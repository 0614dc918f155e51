//! Wiring of the production components from configuration and secrets.

use crate::classifier::StylisticClassifier;
use crate::composer::ResponseComposer;
use crate::config::{Config, Secrets};
use crate::credentials::CredentialPool;
use crate::diagnostics::{Diagnostics, HttpRateLimitProbe};
use crate::factcheck::{FactChecker, HttpCompletionProvider, ModelParams};
use crate::metrics::NocapMetrics;
use crate::pipeline::VerificationPipeline;
use crate::quota::QuotaTracker;
use crate::scrape::HttpPageFetcher;
use crate::search::{EvidenceRetriever, SerperSearchProvider};
use crate::server::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the full application state with real HTTP collaborators.
pub fn assemble(config: &Config, secrets: Secrets) -> Result<AppState> {
    let settings = config.pipeline_settings(secrets.credentials.len());
    let providers = &config.providers;

    let metrics = Arc::new(NocapMetrics::new().context("Failed to register metrics")?);
    let quota = Arc::new(QuotaTracker::new(config.pipeline.search_credits));
    let pool = Arc::new(CredentialPool::new(
        secrets.credentials,
        settings.per_credential_limit,
        quota.clone(),
    ));
    if settings.credential_count == 0 {
        warn!("No AI credentials configured, every request will use the stylistic fallback");
    } else {
        info!("Tokens loaded: {}", settings.credential_count);
    }

    let retriever = match secrets.search_key {
        Some(key) => {
            let provider =
                SerperSearchProvider::new(&providers.search_endpoint, key, settings.search_timeout)?;
            EvidenceRetriever::new(
                Arc::new(provider),
                quota.clone(),
                config.pipeline.search_results,
                settings.search_timeout,
            )
        }
        None => {
            warn!("No search key configured, evidence search disabled");
            EvidenceRetriever::disabled(quota.clone())
        }
    }
    .with_metrics(metrics.clone());
    let search_enabled = retriever.is_enabled();

    let completion = HttpCompletionProvider::new(&providers.completion_endpoint, settings.ai_timeout)?;
    let params = ModelParams {
        model: providers.model.clone(),
        temperature: providers.temperature,
        max_tokens: providers.max_tokens,
    };
    let fact_checker = FactChecker::new(pool.clone(), Arc::new(completion), params, settings.ai_timeout)
        .with_metrics(metrics.clone());

    let fetcher = HttpPageFetcher::new(Duration::from_secs(config.pipeline.scrape_timeout_secs))?;
    let classifier = StylisticClassifier::load_or_unavailable(&config.classifier.model_path);
    let composer = ResponseComposer::new(
        settings.fallback_confidence,
        settings.default_verdict_on_total_failure,
    );

    let pipeline = VerificationPipeline::new(
        Arc::new(fetcher),
        Arc::new(classifier),
        retriever,
        fact_checker,
        composer,
        quota,
    )
    .with_metrics(metrics.clone());

    let liveness_timeout = Duration::from_secs(config.pipeline.liveness_timeout_secs);
    let probe = HttpRateLimitProbe::new(&providers.rate_limit_endpoint, liveness_timeout)?;
    let diagnostics = Diagnostics::new(pool.clone(), Arc::new(probe), liveness_timeout, search_enabled);

    Ok(AppState::new_with_metrics(
        pipeline,
        pool,
        diagnostics,
        config.server.max_body_bytes,
        metrics,
    ))
}
