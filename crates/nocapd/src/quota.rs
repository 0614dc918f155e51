//! Process-wide quota counters.
//!
//! All counters sit behind one mutex so a snapshot is never torn and
//! concurrent increments are never lost. Nothing here is persisted.

use nocap_shared::QuotaSnapshot;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct QuotaState {
    total_requests: u64,
    ai_attempts: u64,
    per_credential: Vec<u64>,
    search_credits_remaining: u64,
}

/// Shared counters, handed to request handlers behind an `Arc`.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    pub fn new(search_credits: u64) -> Self {
        Self {
            state: Mutex::new(QuotaState {
                search_credits_remaining: search_credits,
                ..QuotaState::default()
            }),
        }
    }

    // Counters stay meaningful after a panic elsewhere, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure the first `count` credentials appear in snapshots.
    pub fn register_credentials(&self, count: usize) {
        let mut state = self.lock();
        if state.per_credential.len() < count {
            state.per_credential.resize(count, 0);
        }
    }

    /// Count an accepted request. Returns the new total.
    pub fn record_request(&self) -> u64 {
        let mut state = self.lock();
        state.total_requests += 1;
        state.total_requests
    }

    /// Count one verification attempt against `index`. Returns that
    /// credential's new usage.
    pub fn record_credential_attempt(&self, index: usize) -> u64 {
        let mut state = self.lock();
        if state.per_credential.len() <= index {
            state.per_credential.resize(index + 1, 0);
        }
        state.ai_attempts += 1;
        state.per_credential[index] += 1;
        state.per_credential[index]
    }

    /// Spend one search credit, saturating at zero. Returns what is left.
    pub fn consume_search_credit(&self) -> u64 {
        let mut state = self.lock();
        state.search_credits_remaining = state.search_credits_remaining.saturating_sub(1);
        state.search_credits_remaining
    }

    pub fn credential_usage(&self, index: usize) -> u64 {
        self.lock().per_credential.get(index).copied().unwrap_or(0)
    }

    pub fn requests_served(&self) -> u64 {
        self.lock().total_requests
    }

    pub fn search_credits_remaining(&self) -> u64 {
        self.lock().search_credits_remaining
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        let state = self.lock();
        QuotaSnapshot {
            total_requests: state.total_requests,
            ai_attempts: state.ai_attempts,
            per_credential_usage: state.per_credential.iter().copied().enumerate().collect(),
            search_credits_remaining: state.search_credits_remaining,
        }
    }
}
