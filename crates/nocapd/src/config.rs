//! Configuration management for nocapd.
//!
//! Loads settings from `$NOCAP_CONFIG`, `/etc/nocap/config.toml`, or
//! `/var/lib/nocap/config.toml`, falling back to defaults. Secrets (AI
//! credentials and the search key) are read from the environment only.

use nocap_shared::{Label, MAX_CONFIDENCE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/nocap/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/nocap/config.toml";

/// Environment variable that overrides the config path
pub const CONFIG_ENV: &str = "NOCAP_CONFIG";

/// Environment variable holding the search provider key
pub const SEARCH_KEY_ENV: &str = "SERPER_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Overridden by `$PORT` when set
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Verification pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How many `GITHUB_TOKEN*` variables are read
    #[serde(default = "default_max_credentials")]
    pub max_credentials: usize,

    /// Informational per-credential budget shown by diagnostics
    #[serde(default = "default_per_credential_limit")]
    pub per_credential_limit: u64,

    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    #[serde(default = "default_ai_timeout")]
    pub ai_timeout_secs: u64,

    /// Timeout for each rate-limit introspection call
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,

    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,

    /// Confidence reported on ML_FALLBACK responses
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: u8,

    /// Verdict when both the AI and the stylistic classifier are unavailable
    #[serde(default = "default_verdict")]
    pub default_verdict: Label,

    #[serde(default = "default_search_results")]
    pub search_results: usize,

    /// Pre-paid search credits at startup
    #[serde(default = "default_search_credits")]
    pub search_credits: u64,
}

fn default_max_credentials() -> usize {
    4
}

fn default_per_credential_limit() -> u64 {
    150
}

fn default_search_timeout() -> u64 {
    4
}

fn default_ai_timeout() -> u64 {
    6
}

fn default_liveness_timeout() -> u64 {
    2
}

fn default_scrape_timeout() -> u64 {
    5
}

fn default_fallback_confidence() -> u8 {
    50
}

fn default_verdict() -> Label {
    Label::Real
}

fn default_search_results() -> usize {
    3
}

fn default_search_credits() -> u64 {
    2455
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_credentials: default_max_credentials(),
            per_credential_limit: default_per_credential_limit(),
            search_timeout_secs: default_search_timeout(),
            ai_timeout_secs: default_ai_timeout(),
            liveness_timeout_secs: default_liveness_timeout(),
            scrape_timeout_secs: default_scrape_timeout(),
            fallback_confidence: default_fallback_confidence(),
            default_verdict: default_verdict(),
            search_results: default_search_results(),
            search_credits: default_search_credits(),
        }
    }
}

/// External provider endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_completion_endpoint")]
    pub completion_endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    #[serde(default = "default_rate_limit_endpoint")]
    pub rate_limit_endpoint: String,
}

fn default_completion_endpoint() -> String {
    "https://models.inference.ai.azure.com/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    200
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".to_string()
}

fn default_rate_limit_endpoint() -> String {
    "https://api.github.com/rate_limit".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            completion_endpoint: default_completion_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            search_endpoint: default_search_endpoint(),
            rate_limit_endpoint: default_rate_limit_endpoint(),
        }
    }
}

/// Stylistic classifier artifact location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("/var/lib/nocap/style_model.json")
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub providers: ProviderConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// The knobs the pipeline components read, resolved from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub credential_count: usize,
    pub per_credential_limit: u64,
    pub search_timeout: Duration,
    pub ai_timeout: Duration,
    pub fallback_confidence: u8,
    pub default_verdict_on_total_failure: Label,
}

impl Config {
    /// Load config from the first readable location, or return defaults
    pub fn load() -> Self {
        let mut candidates: Vec<String> = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            candidates.push(path);
        }
        candidates.push(CONFIG_PATH.to_string());
        candidates.push(DEFAULT_CONFIG_PATH.to_string());

        for path in &candidates {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::load_from_path(path) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring config {}: {}", path, e),
            }
        }

        warn!("Config not found, using defaults");
        Config::default()
    }

    /// Load and validate config from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if p.fallback_confidence > MAX_CONFIDENCE {
            return Err(ConfigError::Invalid(format!(
                "fallback_confidence must be at most {}, got {}",
                MAX_CONFIDENCE, p.fallback_confidence
            )));
        }
        for (name, secs) in [
            ("search_timeout_secs", p.search_timeout_secs),
            ("ai_timeout_secs", p.ai_timeout_secs),
            ("liveness_timeout_secs", p.liveness_timeout_secs),
            ("scrape_timeout_secs", p.scrape_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn pipeline_settings(&self, credential_count: usize) -> PipelineSettings {
        PipelineSettings {
            credential_count,
            per_credential_limit: self.pipeline.per_credential_limit,
            search_timeout: Duration::from_secs(self.pipeline.search_timeout_secs),
            ai_timeout: Duration::from_secs(self.pipeline.ai_timeout_secs),
            fallback_confidence: self.pipeline.fallback_confidence,
            default_verdict_on_total_failure: self.pipeline.default_verdict,
        }
    }
}

/// Secrets pulled from the environment at startup.
#[derive(Clone, Default)]
pub struct Secrets {
    /// AI credentials in rotation order
    pub credentials: Vec<String>,
    pub search_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("credentials", &self.credentials.len())
            .field("search_key", &self.search_key.is_some())
            .finish()
    }
}

/// `GITHUB_TOKEN`, `GITHUB_TOKEN2`, `GITHUB_TOKEN3`, ...
pub fn credential_var_name(position: usize) -> String {
    if position == 0 {
        "GITHUB_TOKEN".to_string()
    } else {
        format!("GITHUB_TOKEN{}", position + 1)
    }
}

impl Secrets {
    pub fn from_env(max_credentials: usize) -> Self {
        Self::from_lookup(max_credentials, |name| std::env::var(name).ok())
    }

    /// Empty values are skipped; the remaining order is preserved.
    pub fn from_lookup(max_credentials: usize, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let credentials = (0..max_credentials)
            .filter_map(|i| lookup(&credential_var_name(i)))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        let search_key = lookup(SEARCH_KEY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self {
            credentials,
            search_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.pipeline.per_credential_limit, 150);
        assert_eq!(config.pipeline.search_credits, 2455);
        assert_eq!(config.pipeline.default_verdict, Label::Real);
        assert_eq!(config.providers.model, "gpt-4o");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml_with_partial_sections() {
        let toml_str = r#"
[pipeline]
ai_timeout_secs = 10
fallback_confidence = 65
default_verdict = "MISLEADING"

[providers]
model = "gpt-4o-mini"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pipeline.ai_timeout_secs, 10);
        assert_eq!(config.pipeline.fallback_confidence, 65);
        assert_eq!(config.pipeline.default_verdict, Label::Misleading);
        assert_eq!(config.providers.model, "gpt-4o-mini");
        // Defaults for missing fields
        assert_eq!(config.pipeline.search_timeout_secs, 4);
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn test_pipeline_settings() {
        let config = Config::default();
        let settings = config.pipeline_settings(3);
        assert_eq!(settings.credential_count, 3);
        assert_eq!(settings.ai_timeout, Duration::from_secs(6));
        assert_eq!(settings.search_timeout, Duration::from_secs(4));
        assert_eq!(settings.fallback_confidence, 50);
        assert_eq!(settings.default_verdict_on_total_failure, Label::Real);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.pipeline.fallback_confidence = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.pipeline.ai_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 8080\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.server.port, 8080);

        assert!(matches!(
            Config::load_from_path(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_credential_var_names() {
        assert_eq!(credential_var_name(0), "GITHUB_TOKEN");
        assert_eq!(credential_var_name(1), "GITHUB_TOKEN2");
        assert_eq!(credential_var_name(3), "GITHUB_TOKEN4");
    }

    #[test]
    fn test_secrets_skip_empty_and_keep_order() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_TOKEN", "first"),
            ("GITHUB_TOKEN2", "  "),
            ("GITHUB_TOKEN3", "third"),
            ("GITHUB_TOKEN5", "beyond-max"),
            ("SERPER_API_KEY", "serp"),
        ]
        .into_iter()
        .collect();

        let secrets = Secrets::from_lookup(4, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(secrets.credentials, vec!["first", "third"]);
        assert_eq!(secrets.search_key.as_deref(), Some("serp"));
    }

    #[test]
    fn test_secrets_debug_hides_values() {
        let secrets = Secrets {
            credentials: vec!["ghp_supersecret".into()],
            search_key: Some("serp".into()),
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("supersecret"));
    }
}
