//! Prometheus metrics for the verification pipeline

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Encoder,
    IntCounter, IntCounterVec, Registry, TextEncoder,
};
use std::sync::Arc;

/// Pipeline metrics, one registry per instance
#[derive(Clone)]
pub struct NocapMetrics {
    pub predictions_total: IntCounterVec,
    pub credential_attempts_total: IntCounterVec,
    pub search_requests_total: IntCounterVec,
    pub scrape_failures_total: IntCounter,

    registry: Arc<Registry>,
}

impl NocapMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let predictions_total = register_int_counter_vec_with_registry!(
            "nocap_predictions_total",
            "Predictions served by method",
            &["method"],
            registry
        )?;

        let credential_attempts_total = register_int_counter_vec_with_registry!(
            "nocap_credential_attempts_total",
            "Verification attempts by credential number and outcome",
            &["credential", "outcome"],
            registry
        )?;

        let search_requests_total = register_int_counter_vec_with_registry!(
            "nocap_search_requests_total",
            "Evidence searches by result",
            &["result"],
            registry
        )?;

        let scrape_failures_total = register_int_counter_with_registry!(
            "nocap_scrape_failures_total",
            "URL submissions that could not be scraped",
            registry
        )?;

        Ok(Self {
            predictions_total,
            credential_attempts_total,
            search_requests_total,
            scrape_failures_total,
            registry: Arc::new(registry),
        })
    }

    pub fn record_prediction(&self, method: &str) {
        self.predictions_total.with_label_values(&[method]).inc();
    }

    /// `credential` is the one-based credential number.
    pub fn record_credential_attempt(&self, credential: usize, outcome: &str) {
        let credential = credential.to_string();
        self.credential_attempts_total
            .with_label_values(&[credential.as_str(), outcome])
            .inc();
    }

    pub fn record_search(&self, result: &str) {
        self.search_requests_total.with_label_values(&[result]).inc();
    }

    pub fn record_scrape_failure(&self) {
        self.scrape_failures_total.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
