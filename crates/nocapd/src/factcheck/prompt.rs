//! Prompt construction for the fact-check call.

use nocap_shared::EvidenceItem;
use serde::Serialize;

pub const SYSTEM_PROMPT: &str = "You are a fast JSON fact-checker. Respond with ONLY valid JSON.";

const RESPONSE_SCHEMA: &str = r#"{"verdict": "REAL"|"FAKE"|"MISLEADING", "confidence": int, "explanation": "str", "sources": []}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// One chat-completions request body, shared by every credential attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Evidence as `- link: snippet` lines, in retrieval order.
pub fn render_evidence(evidence: &[EvidenceItem]) -> String {
    evidence
        .iter()
        .map(|item| format!("- {}: {}\n", item.link, item.snippet))
        .collect()
}

pub fn build_user_prompt(title: &str, text: &str, evidence: &[EvidenceItem]) -> String {
    let mut prompt = format!("Analyze: {}.", title.trim());
    let text = text.trim();
    if !text.is_empty() {
        prompt.push_str(&format!(" Text: {}.", text));
    }
    prompt.push_str(&format!(
        " Context: {}. Respond in JSON: {}",
        render_evidence(evidence),
        RESPONSE_SCHEMA
    ));
    prompt
}

pub fn build_request(
    title: &str,
    text: &str,
    evidence: &[EvidenceItem],
    model: &str,
    temperature: f32,
    max_tokens: u32,
) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: build_user_prompt(title, text, evidence),
            },
        ],
        model: model.to_string(),
        temperature,
        max_tokens,
    }
}
