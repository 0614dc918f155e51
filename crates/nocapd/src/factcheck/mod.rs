//! Fact-check orchestration.
//!
//! One evidence-augmented prompt is built per request and offered to each
//! credential in pool order until one yields a parseable verdict:
//!
//! - 2xx with an extractable verdict: success, stop
//! - 401 / 403 / 429: rotate to the next credential
//! - timeout or transport error: rotate, unless this was the last credential
//! - any other status, or 2xx with an unusable body: fail, stop
//!
//! Every attempt is counted against its credential before the outcome is
//! looked at.

pub mod extract;
pub mod prompt;
pub mod provider;

pub use extract::{extract_verdict, find_object_span, ExtractError};
pub use prompt::{build_request, CompletionRequest};
pub use provider::{
    remaining_quota, CompletionProvider, FakeCompletionProvider, HttpCompletionProvider, ProviderError,
    ProviderReply,
};

use crate::credentials::CredentialPool;
use crate::metrics::NocapMetrics;
use nocap_shared::{EvidenceItem, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sentinel reported when the provider sends no remaining-quota header
pub const UNKNOWN_REMAINING: &str = "unknown";

/// Statuses that mean "this credential, not this request"
pub const RETRYABLE_STATUSES: [u16; 3] = [401, 403, 429];

/// Why no verdict came back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactCheckFailure {
    #[error("AI Keys missing in server environment.")]
    NoCredentialsConfigured,

    #[error("All configured AI tokens failed or are rate-limited.")]
    AllCredentialsExhausted,

    #[error("AI processing took too long (Timeout).")]
    Timeout,

    #[error("AI analysis failed ({0}).")]
    Transport(String),

    #[error("AI analysis failed (Status {0}).")]
    UpstreamStatus(u16),

    #[error("AI returned an invalid data format.")]
    Malformed(ExtractError),
}

/// A successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactCheck {
    pub verdict: Verdict,
    /// Provider-reported remaining quota, or `"unknown"`
    pub api_remaining: String,
}

/// Model parameters for the completion request
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.1,
            max_tokens: 200,
        }
    }
}

enum Attempt {
    Done(Result<FactCheck, FactCheckFailure>),
    Rotate,
}

pub struct FactChecker {
    pool: Arc<CredentialPool>,
    provider: Arc<dyn CompletionProvider>,
    params: ModelParams,
    timeout: Duration,
    metrics: Option<Arc<NocapMetrics>>,
}

impl FactChecker {
    pub fn new(
        pool: Arc<CredentialPool>,
        provider: Arc<dyn CompletionProvider>,
        params: ModelParams,
        timeout: Duration,
    ) -> Self {
        Self {
            pool,
            provider,
            params,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NocapMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    fn record(&self, credential: usize, outcome: &str) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_credential_attempt(credential, outcome);
        }
    }

    pub async fn analyze(
        &self,
        title: &str,
        text: &str,
        evidence: &[EvidenceItem],
    ) -> Result<FactCheck, FactCheckFailure> {
        let credentials = self.pool.acquire_ordered();
        if credentials.is_empty() {
            return Err(FactCheckFailure::NoCredentialsConfigured);
        }

        let request = build_request(
            title,
            text,
            evidence,
            &self.params.model,
            self.params.temperature,
            self.params.max_tokens,
        );
        let last = credentials.len() - 1;

        for (position, credential) in credentials.iter().enumerate() {
            let number = credential.number();
            let used = self.pool.record_attempt(credential.index());
            debug!("Credential #{} attempt (used {})", number, used);

            let outcome = tokio::time::timeout(self.timeout, self.provider.complete(credential.secret(), &request))
                .await
                .unwrap_or(Err(ProviderError::Timeout));

            match self.classify(number, outcome, position == last) {
                Attempt::Done(result) => return result,
                Attempt::Rotate => continue,
            }
        }

        warn!("All {} credentials exhausted", credentials.len());
        Err(FactCheckFailure::AllCredentialsExhausted)
    }

    fn classify(&self, number: usize, outcome: Result<ProviderReply, ProviderError>, is_last: bool) -> Attempt {
        let reply = match outcome {
            Ok(reply) => reply,
            Err(error) => {
                self.record(
                    number,
                    match error {
                        ProviderError::Timeout => "timeout",
                        ProviderError::Transport(_) => "transport",
                    },
                );
                if is_last {
                    warn!("Credential #{} failed on last attempt: {}", number, error);
                    return Attempt::Done(Err(match error {
                        ProviderError::Timeout => FactCheckFailure::Timeout,
                        ProviderError::Transport(msg) => FactCheckFailure::Transport(msg),
                    }));
                }
                warn!("Credential #{} failed ({}), trying next", number, error);
                return Attempt::Rotate;
            }
        };

        debug!(
            "Credential #{} status {} remaining {}",
            number,
            reply.status,
            reply.rate_limit_remaining.as_deref().unwrap_or("N/A")
        );

        if reply.is_success() {
            return match extract_verdict(&reply.content) {
                Ok(verdict) => {
                    self.record(number, "success");
                    info!("Credential #{} verdict {} ({}%)", number, verdict.label, verdict.confidence);
                    Attempt::Done(Ok(FactCheck {
                        verdict,
                        api_remaining: reply
                            .rate_limit_remaining
                            .unwrap_or_else(|| UNKNOWN_REMAINING.to_string()),
                    }))
                }
                Err(e) => {
                    self.record(number, "malformed");
                    warn!("Credential #{} returned an unusable body: {}", number, e);
                    Attempt::Done(Err(FactCheckFailure::Malformed(e)))
                }
            };
        }

        if RETRYABLE_STATUSES.contains(&reply.status) {
            self.record(number, "retryable");
            warn!("Credential #{} failed with status {}, trying next", number, reply.status);
            return Attempt::Rotate;
        }

        self.record(number, "fatal");
        warn!("Credential #{} failed with status {}, stopping", number, reply.status);
        Attempt::Done(Err(FactCheckFailure::UpstreamStatus(reply.status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::QuotaTracker;

    const GOOD: &str = r#"{"verdict": "REAL", "confidence": 91, "explanation": "Widely reported.", "sources": ["https://a.example"]}"#;

    fn checker(count: usize, provider: Arc<FakeCompletionProvider>) -> FactChecker {
        let quota = Arc::new(QuotaTracker::new(0));
        let secrets = (1..=count).map(|i| format!("secret-{}", i)).collect();
        let pool = Arc::new(CredentialPool::new(secrets, 150, quota));
        FactChecker::new(pool, provider, ModelParams::default(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_success_attaches_remaining_header() {
        let provider = Arc::new(FakeCompletionProvider::always(ProviderReply::ok(GOOD).with_remaining("149")));
        let result = checker(1, provider).analyze("t", "", &[]).await.unwrap();
        assert_eq!(result.verdict.confidence, 91);
        assert_eq!(result.api_remaining, "149");
    }

    #[tokio::test]
    async fn test_missing_header_is_unknown() {
        let provider = Arc::new(FakeCompletionProvider::always(ProviderReply::ok(GOOD)));
        let result = checker(1, provider).analyze("t", "", &[]).await.unwrap();
        assert_eq!(result.api_remaining, UNKNOWN_REMAINING);
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let provider = Arc::new(FakeCompletionProvider::always(ProviderReply::ok(GOOD)));
        let result = checker(0, provider.clone()).analyze("t", "", &[]).await;
        assert_eq!(result, Err(FactCheckFailure::NoCredentialsConfigured));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_success_body_stops_rotation() {
        let provider = Arc::new(FakeCompletionProvider::always(ProviderReply::ok("no json here")));
        let checker = checker(3, provider.clone());
        let result = checker.analyze("t", "", &[]).await;
        assert_eq!(result, Err(FactCheckFailure::Malformed(ExtractError::NoObject)));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_on_last_credential() {
        let provider = Arc::new(FakeCompletionProvider::new(vec![
            Err(ProviderError::Timeout),
            Err(ProviderError::Transport("connection refused".into())),
        ]));
        let checker = checker(2, provider.clone());
        let result = checker.analyze("t", "", &[]).await;
        assert_eq!(result, Err(FactCheckFailure::Transport("connection refused".into())));
        assert_eq!(checker.pool().used_count(0), 1);
        assert_eq!(checker.pool().used_count(1), 1);
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            FactCheckFailure::AllCredentialsExhausted.to_string(),
            "All configured AI tokens failed or are rate-limited."
        );
        assert_eq!(
            FactCheckFailure::UpstreamStatus(500).to_string(),
            "AI analysis failed (Status 500)."
        );
    }
}
