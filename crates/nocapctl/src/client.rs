//! HTTP client for communicating with nocapd.

use anyhow::{anyhow, Context, Result};
use nocap_shared::{
    DiagnosticsReport, ErrorResponse, HealthResponse, PredictionRequest, PredictionResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default daemon address
pub const DEFAULT_SERVER: &str = "http://localhost:5001";

/// Environment variable overriding the daemon address
pub const SERVER_ENV: &str = "NOCAP_URL";

/// Pick the server URL: explicit flag, then `$NOCAP_URL`, then the default.
pub fn resolve_server(flag: Option<String>, env: Option<String>) -> String {
    flag.or(env)
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
}

/// Client for the nocapd HTTP API
pub struct NocapClient {
    base: String,
    http: reqwest::Client,
}

impl NocapClient {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        // Scrape, search and several credential attempts can stack up
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base: base.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.context("Failed to read response body")?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(anyhow!("nocapd returned {}: {}", status, message));
        }

        serde_json::from_str(&body).context("Unexpected response from nocapd")
    }

    fn unreachable(&self, e: reqwest::Error) -> anyhow::Error {
        anyhow!(
            "Cannot reach nocapd at {}: {}\n\n\
             Is the daemon running? Set {} or pass --server to point elsewhere.",
            self.base,
            e,
            SERVER_ENV
        )
    }

    /// Verify a headline (or URL) with optional body text
    pub async fn check(&self, title: &str, text: Option<String>) -> Result<PredictionResponse> {
        let request = PredictionRequest {
            title: title.to_string(),
            text,
        };
        let response = self
            .http
            .post(self.url("/prediction"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        self.decode(response).await
    }

    pub async fn limits(&self) -> Result<DiagnosticsReport> {
        let response = self
            .http
            .get(self.url("/limit"))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        self.decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(self.url("/"))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        self.decode(response).await
    }
}
