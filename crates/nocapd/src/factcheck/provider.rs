//! Chat-completions provider seam.
//!
//! A provider performs exactly one call per credential attempt and reports
//! the raw outcome (status, reply content, remaining-quota header). Deciding
//! whether to rotate is the fact checker's job.

use super::prompt::CompletionRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Transport-level failures. HTTP statuses are not errors at this layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

/// What came back from one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub status: u16,
    /// Assistant message content on success, raw body otherwise
    pub content: String,
    pub rate_limit_remaining: Option<String>,
}

impl ProviderReply {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            status: 200,
            content: content.into(),
            rate_limit_remaining: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content: String::new(),
            rate_limit_remaining: None,
        }
    }

    pub fn with_remaining(mut self, remaining: impl Into<String>) -> Self {
        self.rate_limit_remaining = Some(remaining.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, secret: &str, request: &CompletionRequest) -> Result<ProviderReply, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
}

/// `choices[0].message.content`, or the body itself when it is not a
/// chat-completions envelope.
pub fn reply_content(body: &str) -> String {
    match serde_json::from_str::<ChatEnvelope>(body) {
        Ok(envelope) => envelope
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default(),
        Err(_) => body.to_string(),
    }
}

/// OpenAI-compatible chat completions with bearer credentials.
pub struct HttpCompletionProvider {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpCompletionProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Remaining quota from `x-ratelimit-remaining`, else `ratelimit-remaining`.
pub fn remaining_quota(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-ratelimit-remaining")
        .or_else(|| header_value(headers, "ratelimit-remaining"))
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, secret: &str, request: &CompletionRequest) -> Result<ProviderReply, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(secret)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let headers = response.headers();
        debug!(
            "Rate limit headers: limit={} remaining={} reset={}",
            header_value(headers, "x-ratelimit-limit").as_deref().unwrap_or("N/A"),
            header_value(headers, "x-ratelimit-remaining").as_deref().unwrap_or("N/A"),
            header_value(headers, "x-ratelimit-reset").as_deref().unwrap_or("N/A"),
        );
        let rate_limit_remaining = remaining_quota(headers);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let content = if (200..300).contains(&status) {
            reply_content(&body)
        } else {
            body
        };

        Ok(ProviderReply {
            status,
            content,
            rate_limit_remaining,
        })
    }
}

/// Fake provider for testing
pub struct FakeCompletionProvider {
    replies: Mutex<VecDeque<Result<ProviderReply, ProviderError>>>,
    delay: Option<Duration>,
    secrets_seen: Mutex<Vec<String>>,
}

impl FakeCompletionProvider {
    /// Replies are returned in call order; the last one repeats.
    pub fn new(replies: Vec<Result<ProviderReply, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            delay: None,
            secrets_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: ProviderReply) -> Self {
        Self::new(vec![Ok(reply)])
    }

    /// Sleep before every reply, to exercise the attempt timeout.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.secrets_seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Credentials in the order they were presented.
    pub fn secrets_seen(&self) -> Vec<String> {
        self.secrets_seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletionProvider {
    async fn complete(&self, secret: &str, _request: &CompletionRequest) -> Result<ProviderReply, ProviderError> {
        self.secrets_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(secret.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        match replies.len() {
            0 => Err(ProviderError::Transport("no scripted reply".to_string())),
            1 => replies[0].clone(),
            _ => replies
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Transport("no scripted reply".to_string()))),
        }
    }
}
