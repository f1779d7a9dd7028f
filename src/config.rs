use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub booking: BookingPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the default configuration; any other error is
    /// surfaced. `${VAR}` and `${VAR:-default}` references are expanded from
    /// the environment before parsing.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let expanded = expand_env_vars(&contents)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

// ============================================================================
// SessionConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Idle lifetime of a session before the store may drop it.
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    /// How many recent turns are handed to the answer generator as context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            history_window: default_history_window(),
        }
    }
}

// ============================================================================
// LlmConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Per-call timeout for chat completions.
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            model: default_model(),
            temperature: None,
            max_tokens: None,
            request_timeout_seconds: default_llm_timeout(),
        }
    }
}

// ============================================================================
// RetrievalConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the external retrieval service. Unset disables retrieval;
    /// document questions are then answered with no supporting passages.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_retrieval_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            top_k: default_top_k(),
            request_timeout_seconds: default_retrieval_timeout(),
        }
    }
}

// ============================================================================
// BookingPolicy
// ============================================================================

/// Policy knobs for booking field validation.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingPolicy {
    /// How far into the future a booking may be placed, in days.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// First bookable hour of the day (inclusive), 24-hour clock.
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,
    /// End of the bookable window (exclusive), 24-hour clock.
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
    /// Slot granularity in minutes; requested times must land on a slot.
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    /// Whether Saturday and Sunday are bookable.
    #[serde(default)]
    pub include_weekends: bool,
    /// Invalid answers allowed per field before offering a restart.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            slot_minutes: default_slot_minutes(),
            include_weekends: false,
            max_attempts: default_max_attempts(),
        }
    }
}

// ============================================================================
// Private Helpers (Serde Defaults)
// ============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    60
}

fn default_session_ttl() -> u64 {
    86400
}

fn default_history_window() -> usize {
    6
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_top_k() -> usize {
    5
}

fn default_retrieval_timeout() -> u64 {
    10
}

fn default_horizon_days() -> u32 {
    60
}

fn default_open_hour() -> u32 {
    9
}

fn default_close_hour() -> u32 {
    17
}

fn default_slot_minutes() -> u32 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports shell-compatible syntax:
/// - `${VAR}` - required variable, errors if not set
/// - `${VAR:-default}` - optional variable with default value
/// - `$$` - escaped `$` (only needed before `{`)
///
/// Nested expansion (`${VAR:-${OTHER}}`) is not supported.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            out.push('$');
            rest = stripped;
        } else if let Some(inner_start) = after.strip_prefix('{') {
            let Some(close) = inner_start.find('}') else {
                return Err(ConfigError::UnclosedVarReference);
            };
            let inner = &inner_start[..close];
            let value = match inner.split_once(":-") {
                Some((name, default)) => {
                    std::env::var(name).unwrap_or_else(|_| default.to_string())
                }
                None => std::env::var(inner)
                    .map_err(|_| ConfigError::MissingEnvVar(inner.to_string()))?,
            };
            out.push_str(&value);
            rest = &inner_start[close + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}
