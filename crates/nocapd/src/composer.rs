//! Final payload composition.
//!
//! The AI verdict always wins when present. Otherwise the stylistic signal
//! decides, at the configured fallback confidence. The two are never mixed.

use crate::factcheck::{FactCheck, FactCheckFailure};
use nocap_shared::{Label, Method, PredictionResponse, StyleSignal, Verdict};

#[derive(Debug, Clone)]
pub struct ResponseComposer {
    fallback_confidence: u8,
    default_verdict: Label,
}

impl ResponseComposer {
    pub fn new(fallback_confidence: u8, default_verdict: Label) -> Self {
        Self {
            fallback_confidence,
            default_verdict,
        }
    }

    pub fn compose(
        &self,
        fact_check: Result<FactCheck, FactCheckFailure>,
        style: StyleSignal,
    ) -> PredictionResponse {
        match fact_check {
            Ok(FactCheck {
                verdict,
                api_remaining,
            }) => PredictionResponse::from_verdict(verdict, style, Method::AiFactCheck, Some(api_remaining)),
            Err(failure) => {
                let label = style.as_label().unwrap_or(self.default_verdict);
                let verdict = Verdict::new(
                    label,
                    self.fallback_confidence,
                    format!("Audit Fallback: {}", failure),
                    Vec::new(),
                );
                PredictionResponse::from_verdict(verdict, style, Method::MlFallback, None)
            }
        }
    }
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new(50, Label::Real)
    }
}
