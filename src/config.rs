//! Environment configuration
//!
//! Values come from the process environment after an optional `.env` file
//! has been loaded.

use crate::llm::OpenAIService;
use crate::runtime::DEFAULT_MAX_ROUNDS;
use crate::strava::DEFAULT_API_BASE;
use crate::tools::DEFAULT_CONCURRENCY;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_MODEL: &str = "qwen3:8b";
const DEFAULT_TRANSCRIPT_PATH: &str = "interactions.db";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("STRAVA_ACCESS_TOKEN is not set")]
    MissingToken,
    #[error("Strava token expired at {expires_at} (now {now})")]
    TokenExpired { expires_at: i64, now: i64 },
}

/// Strava credentials as found in the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StravaCredentials {
    pub access_token: Option<String>,
    /// Unix seconds
    pub expires_at: Option<i64>,
}

impl StravaCredentials {
    /// Usable access token at `now` (unix seconds)
    pub fn valid_token(&self, now: i64) -> Result<&str, ConfigError> {
        let token = match self.access_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ConfigError::MissingToken),
        };
        match self.expires_at {
            Some(expires_at) if now > expires_at => Err(ConfigError::TokenExpired { expires_at, now }),
            _ => Ok(token),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f32,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub max_tokens: Option<u32>,
    /// Model requests allowed per turn
    pub max_rounds: usize,
    pub strava: StravaCredentials,
    pub strava_api_base: String,
    pub tool_concurrency: usize,
    pub transcript_path: PathBuf,
}

impl AgentConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse(&get, "LLM_TEMPERATURE")?.unwrap_or(0.0),
            llm_base_url: get("LLM_BASE_URL").unwrap_or_else(|| OpenAIService::DEFAULT_BASE_URL.to_string()),
            llm_api_key: get("LLM_API_KEY"),
            max_tokens: parse(&get, "LLM_MAX_TOKENS")?,
            max_rounds: parse(&get, "AGENT_MAX_ROUNDS")?
                .unwrap_or(DEFAULT_MAX_ROUNDS)
                .max(1),
            strava: StravaCredentials {
                access_token: get("STRAVA_ACCESS_TOKEN"),
                expires_at: parse::<f64>(&get, "STRAVA_EXPIRES_AT")?.map(seconds),
            },
            strava_api_base: get("STRAVA_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            tool_concurrency: parse(&get, "TOOL_CONCURRENCY")?
                .unwrap_or(DEFAULT_CONCURRENCY)
                .max(1),
            transcript_path: get("TRANSCRIPT_DB_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_TRANSCRIPT_PATH), PathBuf::from),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Expiry timestamps are sometimes written as floats
#[allow(clippy::cast_possible_truncation)]
fn seconds(value: f64) -> i64 {
    value.floor() as i64
}
