//! Evidence retrieval through a paid web search provider.
//!
//! The retriever never fails the pipeline: transport errors, bad statuses,
//! malformed bodies and timeouts all degrade to an empty evidence list.
//! Each attempted call spends one pre-paid search credit, successful or not.

use crate::metrics::NocapMetrics;
use crate::quota::QuotaTracker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use nocap_shared::EvidenceItem;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Search errors. None of these reach the client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Search timed out")]
    Timeout,

    #[error("HTTP {0} from search provider")]
    Status(u16),

    #[error("Malformed search response: {0}")]
    Malformed(String),
}

/// A ranked web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `limit` results, most relevant first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<EvidenceItem>,
}

/// Serper-compatible search over HTTP.
pub struct SerperSearchProvider {
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
}

impl SerperSearchProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build search HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            http,
        })
    }
}

fn transport_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::Network(e.to_string())
    }
}

#[async_trait]
impl SearchProvider for SerperSearchProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query, "num": limit }))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body = response.text().await.map_err(transport_error)?;
        let parsed: SerperResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::Malformed(e.to_string()))?;

        Ok(parsed.organic.into_iter().take(limit).collect())
    }
}

/// Credit-metered, failure-absorbing front of a [`SearchProvider`].
pub struct EvidenceRetriever {
    provider: Option<Arc<dyn SearchProvider>>,
    quota: Arc<QuotaTracker>,
    max_results: usize,
    timeout: Duration,
    metrics: Option<Arc<NocapMetrics>>,
}

impl EvidenceRetriever {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        quota: Arc<QuotaTracker>,
        max_results: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider: Some(provider),
            quota,
            max_results,
            timeout,
            metrics: None,
        }
    }

    /// No search key configured: never calls out, never spends credits.
    pub fn disabled(quota: Arc<QuotaTracker>) -> Self {
        Self {
            provider: None,
            quota,
            max_results: 0,
            timeout: Duration::ZERO,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NocapMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    fn record(&self, result: &str) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_search(result);
        }
    }

    /// Evidence for `query`, or an empty list on any failure.
    pub async fn search(&self, query: &str) -> Vec<EvidenceItem> {
        let Some(provider) = &self.provider else {
            debug!("Search disabled, continuing without evidence");
            return Vec::new();
        };

        let credits_left = self.quota.consume_search_credit();
        debug!("Searching evidence ({} credits left)", credits_left);

        match tokio::time::timeout(self.timeout, provider.search(query, self.max_results)).await {
            Ok(Ok(mut items)) => {
                items.truncate(self.max_results);
                self.record(if items.is_empty() { "empty" } else { "ok" });
                debug!("Retrieved {} evidence items", items.len());
                items
            }
            Ok(Err(e)) => {
                warn!("Search failed, continuing without evidence: {}", e);
                self.record("error");
                Vec::new()
            }
            Err(_) => {
                warn!("Search timed out after {:?}, continuing without evidence", self.timeout);
                self.record("timeout");
                Vec::new()
            }
        }
    }
}

/// Fake search provider for testing
pub struct FakeSearchProvider {
    responses: Mutex<VecDeque<Result<Vec<EvidenceItem>, SearchError>>>,
    delay: Option<Duration>,
    call_count: Mutex<usize>,
}

impl FakeSearchProvider {
    /// Responses are returned in order; the last one repeats.
    pub fn new(responses: Vec<Result<Vec<EvidenceItem>, SearchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            delay: None,
            call_count: Mutex::new(0),
        }
    }

    pub fn always(items: Vec<EvidenceItem>) -> Self {
        Self::new(vec![Ok(items)])
    }

    pub fn always_error(error: SearchError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SearchProvider for FakeSearchProvider {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        *self.call_count.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        match responses.len() {
            0 => Ok(Vec::new()),
            1 => responses[0].clone(),
            _ => responses.pop_front().unwrap_or_else(|| Ok(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: usize) -> EvidenceItem {
        EvidenceItem {
            link: format!("https://news.example/{}", n),
            title: format!("Story {}", n),
            snippet: format!("Snippet {}", n),
        }
    }

    fn retriever(provider: Arc<FakeSearchProvider>, quota: Arc<QuotaTracker>) -> EvidenceRetriever {
        EvidenceRetriever::new(provider, quota, 3, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_results_are_capped_and_ordered() {
        let quota = Arc::new(QuotaTracker::new(10));
        let provider = Arc::new(FakeSearchProvider::always((0..5).map(item).collect()));
        let evidence = retriever(provider, quota.clone()).search("query").await;

        assert_eq!(evidence.len(), 3);
        assert_eq!(evidence[0], item(0));
        assert_eq!(evidence[2], item(2));
        assert_eq!(quota.search_credits_remaining(), 9);
    }

    #[tokio::test]
    async fn test_error_degrades_to_empty_but_spends_credit() {
        let quota = Arc::new(QuotaTracker::new(10));
        let provider = Arc::new(FakeSearchProvider::always_error(SearchError::Status(500)));
        let evidence = retriever(provider.clone(), quota.clone()).search("query").await;

        assert!(evidence.is_empty());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(quota.search_credits_remaining(), 9);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_empty() {
        let quota = Arc::new(QuotaTracker::new(10));
        let provider = Arc::new(
            FakeSearchProvider::always(vec![item(1)]).with_delay(Duration::from_secs(5)),
        );
        let retriever = EvidenceRetriever::new(provider, quota.clone(), 3, Duration::from_millis(20));

        assert!(retriever.search("query").await.is_empty());
        assert_eq!(quota.search_credits_remaining(), 9);
    }

    #[tokio::test]
    async fn test_disabled_spends_nothing() {
        let quota = Arc::new(QuotaTracker::new(10));
        let retriever = EvidenceRetriever::disabled(quota.clone());

        assert!(!retriever.is_enabled());
        assert!(retriever.search("query").await.is_empty());
        assert_eq!(quota.search_credits_remaining(), 10);
    }

    #[test]
    fn test_serper_body_parses_organic_results() {
        let body = r#"{
            "searchParameters": {"q": "x"},
            "organic": [
                {"title": "T1", "link": "https://a.example", "snippet": "S1", "position": 1},
                {"title": "T2", "link": "https://b.example"}
            ]
        }"#;
        let parsed: SerperResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.organic.len(), 2);
        assert_eq!(parsed.organic[0].snippet, "S1");
        assert_eq!(parsed.organic[1].snippet, "");
    }
}
