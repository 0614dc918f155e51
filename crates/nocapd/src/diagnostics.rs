//! Quota diagnostics for `GET /limit`.
//!
//! Combines the local counters with a live rate-limit probe per credential.
//! Probes run concurrently, each with its own short timeout, and a failing
//! probe only marks its own row.

use crate::credentials::CredentialPool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nocap_shared::{
    CredentialReport, CredentialStatus, DiagnosticsReport, SearchReport, SearchStatus,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Reported when the introspection body has no limit
const DEFAULT_REST_LIMIT: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,

    #[error("probe failed: {0}")]
    Transport(String),
}

/// What the provider's rate-limit introspection said about one credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub status: u16,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Window reset, as a Unix timestamp
    pub reset: Option<i64>,
}

#[async_trait]
pub trait RateLimitProbe: Send + Sync {
    async fn probe(&self, secret: &str) -> Result<RateLimitInfo, ProbeError>;
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitBody {
    #[serde(default)]
    resources: RateLimitResources,
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitResources {
    #[serde(default)]
    core: RateLimitCore,
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitCore {
    limit: Option<u64>,
    remaining: Option<u64>,
    reset: Option<i64>,
}

/// Parse a `{ resources: { core: { limit, remaining, reset } } }` body.
pub fn parse_rate_limit(status: u16, body: &str) -> RateLimitInfo {
    let core = serde_json::from_str::<RateLimitBody>(body)
        .map(|b| b.resources.core)
        .unwrap_or_default();

    RateLimitInfo {
        status,
        limit: core.limit,
        remaining: core.remaining,
        reset: core.reset,
    }
}

/// GitHub-style `rate_limit` endpoint over HTTP.
pub struct HttpRateLimitProbe {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpRateLimitProbe {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nocapd/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build rate-limit HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }
}

fn probe_error(e: reqwest::Error) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout
    } else {
        ProbeError::Transport(e.to_string())
    }
}

#[async_trait]
impl RateLimitProbe for HttpRateLimitProbe {
    async fn probe(&self, secret: &str) -> Result<RateLimitInfo, ProbeError> {
        let response = self
            .http
            .get(&self.endpoint)
            .bearer_auth(secret)
            .send()
            .await
            .map_err(probe_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(probe_error)?;
        Ok(parse_rate_limit(status, &body))
    }
}

/// Fake probe for testing: answers keyed by secret, unknown secrets fail.
#[derive(Default)]
pub struct FakeRateLimitProbe {
    answers: HashMap<String, Result<RateLimitInfo, ProbeError>>,
}

impl FakeRateLimitProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, secret: &str, answer: Result<RateLimitInfo, ProbeError>) -> Self {
        self.answers.insert(secret.to_string(), answer);
        self
    }
}

#[async_trait]
impl RateLimitProbe for FakeRateLimitProbe {
    async fn probe(&self, secret: &str) -> Result<RateLimitInfo, ProbeError> {
        self.answers
            .get(secret)
            .cloned()
            .unwrap_or_else(|| Err(ProbeError::Transport("unknown credential".to_string())))
    }
}

/// `"<minutes>m"` until `reset`, floored at zero.
pub fn format_reset(reset: i64, now: DateTime<Utc>) -> String {
    let seconds_left = reset.saturating_sub(now.timestamp()).max(0);
    format!("{}m", seconds_left / 60)
}

pub struct Diagnostics {
    pool: Arc<CredentialPool>,
    probe: Arc<dyn RateLimitProbe>,
    timeout: Duration,
    search_enabled: bool,
}

impl Diagnostics {
    pub fn new(
        pool: Arc<CredentialPool>,
        probe: Arc<dyn RateLimitProbe>,
        timeout: Duration,
        search_enabled: bool,
    ) -> Self {
        Self {
            pool,
            probe,
            timeout,
            search_enabled,
        }
    }

    pub async fn report(&self) -> DiagnosticsReport {
        let now = Utc::now();
        let mut join_set = JoinSet::new();

        for credential in self.pool.acquire_ordered() {
            let probe = self.probe.clone();
            let secret = credential.secret().to_string();
            let index = credential.index();
            let timeout = self.timeout;

            join_set.spawn(async move {
                let outcome = tokio::time::timeout(timeout, probe.probe(&secret))
                    .await
                    .unwrap_or(Err(ProbeError::Timeout));
                (index, outcome)
            });
        }

        let mut outcomes: HashMap<usize, Result<RateLimitInfo, ProbeError>> = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    outcomes.insert(index, outcome);
                }
                Err(e) => warn!("Rate-limit probe task failed: {}", e),
            }
        }

        let credentials = self
            .pool
            .acquire_ordered()
            .iter()
            .map(|credential| {
                let outcome = outcomes
                    .remove(&credential.index())
                    .unwrap_or_else(|| Err(ProbeError::Transport("probe task lost".to_string())));

                let mut report = CredentialReport {
                    token_index: credential.number(),
                    token_snippet: credential.snippet(),
                    used: self.pool.used_count(credential.index()),
                    remaining: self.pool.remaining(credential),
                    rest_limit: None,
                    rest_remaining: None,
                    rest_reset: None,
                    status: CredentialStatus::Failed,
                };

                match outcome {
                    Ok(info) => {
                        debug!("Credential #{} probe status {}", credential.number(), info.status);
                        report.status = if info.status == 200 {
                            CredentialStatus::Active
                        } else {
                            CredentialStatus::Expired
                        };
                        report.rest_limit = Some(info.limit.unwrap_or(DEFAULT_REST_LIMIT));
                        report.rest_remaining = Some(info.remaining.unwrap_or(0));
                        report.rest_reset = Some(format_reset(info.reset.unwrap_or(0), now));
                    }
                    Err(e) => warn!("Credential #{}: FAILED {}", credential.number(), e),
                }
                report
            })
            .collect();

        let quota = self.pool.quota().snapshot();
        let search = SearchReport {
            remaining_credits: quota.search_credits_remaining,
            status: if self.search_enabled {
                SearchStatus::Active
            } else {
                SearchStatus::Offline
            },
        };

        DiagnosticsReport {
            generated_at: now,
            quota,
            credentials,
            search,
        }
    }
}
