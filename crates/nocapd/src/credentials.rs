//! Credential pool for the verification provider.
//!
//! Credentials are kept in configuration order, which is also the fallback
//! order. Nothing is removed at runtime: exhaustion is decided per request
//! by the fact checker, not by the pool.

use crate::quota::QuotaTracker;
use std::sync::Arc;

/// One API credential. `Debug` never prints the secret.
#[derive(Clone)]
pub struct Credential {
    index: usize,
    secret: String,
    soft_limit: u64,
}

impl Credential {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// One-based position, as shown to humans.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// `...` plus the last 8 characters of the secret.
    pub fn snippet(&self) -> String {
        let chars: Vec<char> = self.secret.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
        format!("...{}", tail)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .field("secret", &self.snippet())
            .field("soft_limit", &self.soft_limit)
            .finish()
    }
}

#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    quota: Arc<QuotaTracker>,
}

impl CredentialPool {
    pub fn new(secrets: Vec<String>, soft_limit: u64, quota: Arc<QuotaTracker>) -> Self {
        let credentials: Vec<Credential> = secrets
            .into_iter()
            .enumerate()
            .map(|(index, secret)| Credential {
                index,
                secret,
                soft_limit,
            })
            .collect();
        quota.register_credentials(credentials.len());

        Self { credentials, quota }
    }

    /// Every credential, in rotation order.
    pub fn acquire_ordered(&self) -> &[Credential] {
        &self.credentials
    }

    /// Count an attempt against `index`, whatever its outcome.
    pub fn record_attempt(&self, index: usize) -> u64 {
        self.quota.record_credential_attempt(index)
    }

    pub fn used_count(&self, index: usize) -> u64 {
        self.quota.credential_usage(index)
    }

    /// Soft limit minus usage, floored at zero.
    pub fn remaining(&self, credential: &Credential) -> u64 {
        credential
            .soft_limit
            .saturating_sub(self.used_count(credential.index))
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }
}
