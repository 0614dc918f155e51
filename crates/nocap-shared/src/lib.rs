//! Shared types for NoCap components.
//!
//! Everything that crosses the HTTP boundary between `nocapd` and its clients
//! lives here so the daemon and `nocapctl` agree on one wire format.

pub mod quota;
pub mod verdict;
pub mod wire;

pub use quota::{
    CredentialReport, CredentialStatus, DiagnosticsReport, QuotaSnapshot, SearchReport,
    SearchStatus,
};
pub use verdict::{EvidenceItem, Label, Method, StyleSignal, Verdict, MAX_CONFIDENCE};
pub use wire::{AiState, ErrorResponse, HealthResponse, PredictionRequest, PredictionResponse};

/// Crate version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
