//! Verdict extraction from free-form model output.
//!
//! Models wrap their JSON in prose or code fences. The scanner finds the
//! first `{`, tracks depth while honouring JSON strings and escapes, and
//! returns the balanced span. A flat object is the only accepted shape:
//! nested objects, a second object, or unbalanced braces are rejected.

use nocap_shared::{Label, Verdict, MAX_CONFIDENCE};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found")]
    NoObject,

    #[error("unbalanced braces")]
    Unbalanced,

    #[error("nested object at byte {0}")]
    Nested(usize),

    #[error("more than one JSON object")]
    MultipleObjects,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing or invalid field '{0}'")]
    MissingField(&'static str),

    #[error("unknown verdict label '{0}'")]
    UnknownLabel(String),
}

/// Byte range of the first balanced top-level object in `content`.
pub fn find_object_span(content: &str) -> Result<&str, ExtractError> {
    let start = content.find('{').ok_or(ExtractError::NoObject)?;
    let end = scan_object(content, start)?;

    if content[end..].contains('{') {
        return Err(ExtractError::MultipleObjects);
    }

    Ok(&content[start..end])
}

/// Scan from the `{` at `start`; returns the index one past the closing `}`.
fn scan_object(content: &str, start: usize) -> Result<usize, ExtractError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in content.as_bytes()[start..].iter().enumerate() {
        let pos = start + offset;

        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => {
                depth += 1;
                if depth > 1 {
                    return Err(ExtractError::Nested(pos));
                }
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos + 1);
                }
            }
            _ => {}
        }
    }

    Err(ExtractError::Unbalanced)
}

fn confidence_of(fields: &Map<String, Value>) -> Result<u8, ExtractError> {
    let raw = match fields.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        // Some models quote numbers
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or(ExtractError::MissingField("confidence"))?;

    Ok(raw.round().clamp(0.0, MAX_CONFIDENCE as f64) as u8)
}

fn sources_of(fields: &Map<String, Value>) -> Vec<String> {
    match fields.get("sources") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Extract a complete [`Verdict`] from model output.
///
/// `verdict` and `confidence` are required. `explanation` and `sources`
/// default to empty. Confidence is clamped to `0..=100`.
pub fn extract_verdict(content: &str) -> Result<Verdict, ExtractError> {
    let span = find_object_span(content)?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| ExtractError::InvalidJson(e.to_string()))?;
    let fields = value.as_object().ok_or(ExtractError::NoObject)?;

    let raw_label = fields
        .get("verdict")
        .and_then(Value::as_str)
        .ok_or(ExtractError::MissingField("verdict"))?;
    let label = Label::parse(raw_label).ok_or_else(|| ExtractError::UnknownLabel(raw_label.to_string()))?;

    let confidence = confidence_of(fields)?;
    let explanation = fields
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Verdict::new(label, confidence, explanation, sources_of(fields)))
}
