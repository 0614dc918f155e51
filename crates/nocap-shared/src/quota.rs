//! Quota snapshot and diagnostics report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time copy of the process-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// `/prediction` requests accepted.
    pub total_requests: u64,
    /// Verification calls attempted across all credentials.
    pub ai_attempts: u64,
    /// Attempts per credential, keyed by zero-based configuration index.
    pub per_credential_usage: BTreeMap<usize, u64>,
    pub search_credits_remaining: u64,
}

impl QuotaSnapshot {
    pub fn usage_of(&self, index: usize) -> u64 {
        self.per_credential_usage.get(&index).copied().unwrap_or(0)
    }
}

/// Liveness of a credential according to the provider's introspection API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "EXPIRED/ERROR")]
    Expired,
    #[serde(rename = "FAILED")]
    Failed,
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialStatus::Active => write!(f, "ACTIVE"),
            CredentialStatus::Expired => write!(f, "EXPIRED/ERROR"),
            CredentialStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Per-credential row of the diagnostics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialReport {
    /// One-based position in the rotation order.
    pub token_index: usize,
    /// `...` followed by the last 8 characters of the secret.
    pub token_snippet: String,
    pub used: u64,
    /// Soft limit minus attempts so far.
    pub remaining: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_remaining: Option<u64>,
    /// Minutes until the provider resets its window, e.g. `"42m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_reset: Option<String>,
    pub status: CredentialStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchStatus {
    Active,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    pub remaining_credits: u64,
    pub status: SearchStatus,
}

/// Body of `GET /limit`.
///
/// The `github_tokens`/`serper_api` wire names are what the web client reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub generated_at: DateTime<Utc>,
    pub quota: QuotaSnapshot,
    #[serde(rename = "github_tokens")]
    pub credentials: Vec<CredentialReport>,
    #[serde(rename = "serper_api")]
    pub search: SearchReport,
}
