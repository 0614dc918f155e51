//! Verdict types: labels, the stylistic signal, and evidence items.

use serde::{Deserialize, Serialize};

/// Upper bound for confidence values (percent).
pub const MAX_CONFIDENCE: u8 = 100;

/// Final classification of a news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Real,
    Fake,
    Misleading,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "REAL",
            Label::Fake => "FAKE",
            Label::Misleading => "MISLEADING",
        }
    }

    /// Case-insensitive parse, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "REAL" => Some(Label::Real),
            "FAKE" => Some(Label::Fake),
            "MISLEADING" => Some(Label::Misleading),
            _ => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of the local stylistic classifier.
///
/// `Unavailable` means the classifier has no opinion (artifacts failed to
/// load). It must never be read as `Real`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StyleSignal {
    Real,
    Fake,
    Unavailable,
}

impl StyleSignal {
    /// The label this signal votes for, if any.
    pub fn as_label(&self) -> Option<Label> {
        match self {
            StyleSignal::Real => Some(Label::Real),
            StyleSignal::Fake => Some(Label::Fake),
            StyleSignal::Unavailable => None,
        }
    }
}

impl std::fmt::Display for StyleSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleSignal::Real => write!(f, "REAL"),
            StyleSignal::Fake => write!(f, "FAKE"),
            StyleSignal::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

/// Which signal produced the final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    AiFactCheck,
    MlFallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::AiFactCheck => "AI_FACT_CHECK",
            Method::MlFallback => "ML_FALLBACK",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully populated verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "verdict")]
    pub label: Label,
    pub confidence: u8,
    pub explanation: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Verdict {
    /// Build a verdict, clamping confidence to `0..=100`.
    pub fn new(label: Label, confidence: u8, explanation: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            label,
            confidence: confidence.min(MAX_CONFIDENCE),
            explanation: explanation.into(),
            sources,
        }
    }
}

/// One search result used as corroborating context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_is_lenient() {
        assert_eq!(Label::parse("real"), Some(Label::Real));
        assert_eq!(Label::parse(" Fake "), Some(Label::Fake));
        assert_eq!(Label::parse("MISLEADING"), Some(Label::Misleading));
        assert_eq!(Label::parse("satire"), None);
    }

    #[test]
    fn test_unavailable_has_no_label() {
        assert_eq!(StyleSignal::Unavailable.as_label(), None);
        assert_eq!(StyleSignal::Fake.as_label(), Some(Label::Fake));
    }

    #[test]
    fn test_verdict_clamps_confidence() {
        let v = Verdict::new(Label::Real, 250, "x", vec![]);
        assert_eq!(v.confidence, 100);
    }
}
