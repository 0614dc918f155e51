//! Terminal rendering of daemon responses.

use nocap_shared::{
    CredentialStatus, DiagnosticsReport, HealthResponse, Label, Method, PredictionResponse,
    SearchStatus,
};
use owo_colors::OwoColorize;
use std::fmt::Write;

fn label(label: Label, color: bool) -> String {
    let text = label.as_str();
    if !color {
        return text.to_string();
    }
    match label {
        Label::Real => text.green().bold().to_string(),
        Label::Fake => text.red().bold().to_string(),
        Label::Misleading => text.yellow().bold().to_string(),
    }
}

fn dim(text: &str, color: bool) -> String {
    if color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

pub fn render_prediction(response: &PredictionResponse, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {}%",
        label(response.verdict, color),
        response.confidence
    );

    let method = match response.method {
        Method::AiFactCheck => "AI fact check",
        Method::MlFallback => "stylistic fallback",
    };
    let _ = writeln!(out, "{} {}", dim("Method:", color), method);
    let _ = writeln!(out, "{} {}", dim("Style: ", color), response.style_analysis);
    if let Some(ref remaining) = response.api_remaining {
        let _ = writeln!(out, "{} {}", dim("Quota: ", color), remaining);
    }

    if !response.explanation.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", response.explanation);
    }

    if !response.sources.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", dim("Sources:", color));
        for source in &response.sources {
            let _ = writeln!(out, "  - {}", source);
        }
    }
    out
}

fn credential_status(status: CredentialStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        CredentialStatus::Active => text.green().to_string(),
        CredentialStatus::Expired => text.yellow().to_string(),
        CredentialStatus::Failed => text.red().to_string(),
    }
}

pub fn render_limits(report: &DiagnosticsReport, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Requests served: {}   AI attempts: {}",
        report.quota.total_requests, report.quota.ai_attempts
    );
    let _ = writeln!(out);

    if report.credentials.is_empty() {
        let _ = writeln!(out, "No AI credentials configured");
    }
    for row in &report.credentials {
        let _ = write!(
            out,
            "#{} {:<12} {:<14} used {:>4}  remaining {:>4}",
            row.token_index,
            row.token_snippet,
            credential_status(row.status, color),
            row.used,
            row.remaining
        );
        if let (Some(limit), Some(rest)) = (row.rest_limit, row.rest_remaining) {
            let _ = write!(
                out,
                "  api {}/{} reset {}",
                rest,
                limit,
                row.rest_reset.as_deref().unwrap_or("?")
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out);
    let search = match report.search.status {
        SearchStatus::Active => "active",
        SearchStatus::Offline => "offline",
    };
    let _ = writeln!(
        out,
        "Search: {} ({} credits left)",
        search, report.search.remaining_credits
    );
    out
}

pub fn render_health(health: &HealthResponse, color: bool) -> String {
    let status = if color {
        health.status.green().to_string()
    } else {
        health.status.clone()
    };
    format!(
        "nocapd v{} {}\nAI: {:?} ({} credentials)\nRequests: {}\nUptime: {}s\n",
        health.version,
        status,
        health.ai,
        health.tokens_active,
        health.requests_processed,
        health.uptime_seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nocap_shared::{CredentialReport, QuotaSnapshot, SearchReport, StyleSignal};

    #[test]
    fn test_render_prediction_plain() {
        let response = PredictionResponse {
            verdict: Label::Fake,
            confidence: 82,
            explanation: "No outlet confirms it.".into(),
            sources: vec!["https://a.example".into()],
            style_analysis: StyleSignal::Fake,
            method: Method::AiFactCheck,
            api_remaining: Some("140".into()),
        };

        let out = render_prediction(&response, false);
        assert!(out.starts_with("FAKE  82%"));
        assert!(out.contains("Method: AI fact check"));
        assert!(out.contains("  - https://a.example"));
        assert!(out.contains("Quota:  140"));
    }

    #[test]
    fn test_render_limits_plain() {
        let report = DiagnosticsReport {
            generated_at: Utc::now(),
            quota: QuotaSnapshot {
                total_requests: 3,
                ai_attempts: 4,
                ..Default::default()
            },
            credentials: vec![CredentialReport {
                token_index: 1,
                token_snippet: "...abcdefgh".into(),
                used: 4,
                remaining: 146,
                rest_limit: None,
                rest_remaining: None,
                rest_reset: None,
                status: CredentialStatus::Failed,
            }],
            search: SearchReport {
                remaining_credits: 2450,
                status: SearchStatus::Active,
            },
        };

        let out = render_limits(&report, false);
        assert!(out.contains("#1 ...abcdefgh"));
        assert!(out.contains("FAILED"));
        assert!(!out.contains("api "));
        assert!(out.contains("Search: active (2450 credits left)"));
    }
}
