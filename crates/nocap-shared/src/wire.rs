//! Request and response bodies for the daemon's HTTP API.

use serde::{Deserialize, Serialize};

use crate::verdict::{Label, Method, StyleSignal, Verdict};

/// Body of `POST /prediction`.
///
/// `title` may itself be a URL, in which case the daemon scrapes the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Body returned by `POST /prediction` on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub verdict: Label,
    pub confidence: u8,
    pub explanation: String,
    pub sources: Vec<String>,
    pub style_analysis: StyleSignal,
    pub method: Method,
    /// Provider-reported remaining quota, only on `AI_FACT_CHECK` responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_remaining: Option<String>,
}

impl PredictionResponse {
    pub fn from_verdict(
        verdict: Verdict,
        style_analysis: StyleSignal,
        method: Method,
        api_remaining: Option<String>,
    ) -> Self {
        Self {
            verdict: verdict.label,
            confidence: verdict.confidence,
            explanation: verdict.explanation,
            sources: verdict.sources,
            style_analysis,
            method,
            api_remaining,
        }
    }
}

/// Error body for client errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Whether any AI credential is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AiState {
    Ready,
    Offline,
}

/// Body of `GET /` and `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ai: AiState,
    pub tokens_active: usize,
    pub requests_processed: u64,
    pub uptime_seconds: u64,
}
