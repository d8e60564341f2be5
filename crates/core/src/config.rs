use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Key/value lookup used to build a [`Config`]. The process environment in
/// production, a map in tests.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Read a profiled var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt(lookup: Lookup<'_>, profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed).filter(|s| !s.is_empty()) {
            return Some(v);
        }
    }
    lookup(key).filter(|s| !s.is_empty())
}

fn profiled_or(lookup: Lookup<'_>, profile: &str, key: &str, default: &str) -> String {
    profiled_opt(lookup, profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_u32(lookup: Lookup<'_>, profile: &str, key: &str, default: u32) -> u32 {
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_u64(lookup: Lookup<'_>, profile: &str, key: &str, default: u64) -> u64 {
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    pub eval: EvalConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `FINAGENT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = process_env("FINAGENT_PROFILE").unwrap_or_default();
        Self::for_profile_with(&profile, &process_env)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        Self::for_profile_with(profile, &process_env)
    }

    /// Build config from an arbitrary key lookup.
    pub fn for_profile_with(profile: &str, lookup: Lookup<'_>) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            llm: LlmConfig::from_lookup(lookup, p),
            tools: ToolsConfig::from_lookup(lookup, p),
            eval: EvalConfig::from_lookup(lookup, p),
        }
    }

    /// Reject values that would only fail later, deep inside a run.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mode = self.eval.keyword_mode.to_lowercase();
        if mode != "strict" && mode != "lenient" {
            return Err(CoreError::InvalidConfig {
                key: "EVAL_KEYWORD_MODE".to_string(),
                value: self.eval.keyword_mode.clone(),
            });
        }
        if !is_iso_date(&self.tools.news_from_date) {
            return Err(CoreError::InvalidConfig {
                key: "NEWS_FROM_DATE".to_string(),
                value: self.tools.news_from_date.clone(),
            });
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  llm:    base_url={}, model={}, key={}",
            self.llm.base_url,
            self.llm.model,
            redact(&self.llm.api_key)
        );
        tracing::info!(
            "  tools:  news_key={}, fx_key={}, regulations={}",
            redact(&self.tools.news_api_key),
            redact(&self.tools.exchange_rate_api_key),
            self.tools.regulations_dir.display()
        );
        tracing::info!(
            "  eval:   call_log={}, mode={}, timeout={}s",
            self.eval.call_log_file.display(),
            self.eval.keyword_mode,
            self.eval.call_timeout_secs
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "llm": {
                "base_url": self.llm.base_url,
                "model": self.llm.model,
                "configured": self.llm.is_configured(),
            },
            "tools": {
                "news": self.tools.news_api_key.is_some(),
                "currency": self.tools.exchange_rate_api_key.is_some(),
                "regulations_dir": self.tools.regulations_dir,
            },
            "eval": {
                "call_log_file": self.eval.call_log_file,
                "keyword_mode": self.eval.keyword_mode,
                "call_timeout_secs": self.eval.call_timeout_secs,
            },
        })
    }
}

/// `YYYY-MM-DD` shape check.
fn is_iso_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == 3
        && parts[0].len() == 4
        && parts[1].len() == 2
        && parts[2].len() == 2
        && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() { "(set)" } else { "(none)" }
}

// ── LLM (OpenAI-compatible) ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        Self {
            base_url: profiled_or(lookup, p, "LLM_BASE_URL", "https://api.openai.com"),
            api_key: profiled_opt(lookup, p, "LLM_API_KEY"),
            model: profiled_or(lookup, p, "LLM_MODEL", "gpt-4o-mini"),
            temperature: profiled_or(lookup, p, "LLM_TEMPERATURE", "0.1")
                .parse()
                .unwrap_or(0.1),
            max_tokens: profiled_u32(lookup, p, "LLM_MAX_TOKENS", 2048),
        }
    }

    /// Local gateways (ollama, llama.cpp) accept requests without a key.
    pub fn is_local(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.is_local()
    }
}

// ── Tool credentials and data ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub news_api_key: Option<String>,
    pub news_language: String,
    /// Earliest publication date for news searches (YYYY-MM-DD).
    pub news_from_date: String,
    pub exchange_rate_api_key: Option<String>,
    pub regulations_dir: PathBuf,
}

impl ToolsConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        Self {
            news_api_key: profiled_opt(lookup, p, "NEWS_API_KEY"),
            news_language: profiled_or(lookup, p, "NEWS_LANGUAGE", "ru"),
            news_from_date: profiled_or(lookup, p, "NEWS_FROM_DATE", "2025-06-01"),
            exchange_rate_api_key: profiled_opt(lookup, p, "EXCHANGE_RATE_API_KEY"),
            regulations_dir: PathBuf::from(profiled_or(
                lookup,
                p,
                "REGULATIONS_DIR",
                "data/regulations",
            )),
        }
    }
}

// ── Evaluation / call logging ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub call_log_file: PathBuf,
    pub tasks_file: PathBuf,
    pub results_file: PathBuf,
    /// "strict" or "lenient"; parsed by the evaluation crate.
    pub keyword_mode: String,
    /// Per-call timeout in seconds, 0 disables it.
    pub call_timeout_secs: u64,
}

impl EvalConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        Self {
            call_log_file: PathBuf::from(profiled_or(
                lookup,
                p,
                "CALL_LOG_FILE",
                "logs/agent_calls.csv",
            )),
            tasks_file: PathBuf::from(profiled_or(
                lookup,
                p,
                "EVAL_TASKS_FILE",
                "data/eval_tasks.jsonl",
            )),
            results_file: PathBuf::from(profiled_or(
                lookup,
                p,
                "EVAL_RESULTS_FILE",
                "logs/eval_results.jsonl",
            )),
            keyword_mode: profiled_or(lookup, p, "EVAL_KEYWORD_MODE", "lenient"),
            call_timeout_secs: profiled_u64(lookup, p, "EVAL_CALL_TIMEOUT_SECS", 0),
        }
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}
