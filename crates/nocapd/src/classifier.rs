//! Stylistic classifier
//!
//! Wraps a TF-IDF + logistic regression model exported to JSON. The model
//! is loaded once at startup and never mutated. If loading fails the
//! classifier reports `UNAVAILABLE` for the lifetime of the process.

use nocap_shared::StyleSignal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Inconsistent model artifact: {0}")]
    Inconsistent(String),
}

/// Anything that maps normalized text to REAL/FAKE.
pub trait TextClassifier: Send + Sync {
    /// `true` when the text reads as fake.
    fn is_fake(&self, normalized: &str) -> bool;
}

/// Exported vectorizer vocabulary, idf weights, and regression weights.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearTfidfModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearTfidfModel {
    pub fn new(
        vocabulary: HashMap<String, usize>,
        idf: Vec<f64>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, ClassifierError> {
        let model = Self {
            vocabulary,
            idf,
            coefficients,
            intercept,
        };
        model.check()?;
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let model: Self = serde_json::from_str(json)?;
        model.check()?;
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn check(&self) -> Result<(), ClassifierError> {
        let dims = self.idf.len();
        if self.coefficients.len() != dims {
            return Err(ClassifierError::Inconsistent(format!(
                "{} idf weights but {} coefficients",
                dims,
                self.coefficients.len()
            )));
        }
        if let Some((term, col)) = self.vocabulary.iter().find(|(_, col)| **col >= dims) {
            return Err(ClassifierError::Inconsistent(format!(
                "term '{}' maps to column {} of {}",
                term, col, dims
            )));
        }
        Ok(())
    }

    /// Signed distance from the decision boundary; positive means FAKE.
    pub fn decision(&self, normalized: &str) -> f64 {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        // The vectorizer only tokenizes words of two or more characters
        for token in normalized.split_whitespace().filter(|t| t.chars().count() >= 2) {
            if let Some(&col) = self.vocabulary.get(token) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, tf)| (col, tf * self.idf[col]))
            .collect();
        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return self.intercept;
        }

        weighted
            .iter()
            .map(|(col, w)| self.coefficients[*col] * (w / norm))
            .sum::<f64>()
            + self.intercept
    }
}

impl TextClassifier for LinearTfidfModel {
    fn is_fake(&self, normalized: &str) -> bool {
        self.decision(normalized) > 0.0
    }
}

pub struct StylisticClassifier {
    model: Option<Box<dyn TextClassifier>>,
}

impl StylisticClassifier {
    pub fn new(model: Box<dyn TextClassifier>) -> Self {
        Self { model: Some(model) }
    }

    pub fn unavailable() -> Self {
        Self { model: None }
    }

    /// Load the artifact at `path`, or degrade to `UNAVAILABLE`.
    pub fn load_or_unavailable(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match LinearTfidfModel::load(path) {
            Ok(model) => {
                info!("Loaded stylistic model from {}", path.display());
                Self::new(Box::new(model))
            }
            Err(e) => {
                warn!("Stylistic classifier unavailable ({}): {}", path.display(), e);
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn classify(&self, normalized: &str) -> StyleSignal {
        match &self.model {
            Some(model) if model.is_fake(normalized) => StyleSignal::Fake,
            Some(_) => StyleSignal::Real,
            None => StyleSignal::Unavailable,
        }
    }
}
