// src/config.rs
//! Explicit runtime configuration handed to the workflow manager.
//!
//! Recognised options:
//! - `model` (`GAMECRAFT_MODEL`): LLM bound to the collaborators unless a call overrides it.
//! - `cache_ttl` (`CACHE_TTL`, seconds, at most one year): default TTL of cached research. Event research uses twice this.
//! - `request_timeout` (`REQUEST_TIMEOUT`, seconds, at most one year): per-step timeout and HTTP client timeout.
//! - `min_duration` / `max_duration` (`MIN_DURATION` / `MAX_DURATION`): accepted script length in minutes.
//! - `redis_url` (`REDIS_URL`): selects the Redis cache backend when built with `redis-cache`.
//! - API credentials: absent credentials make the matching service fall back to placeholder data.

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Upper bound for `CACHE_TTL` and `REQUEST_TIMEOUT`, in seconds (one year).
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    pub min_duration: u32,
    pub max_duration: u32,
    pub redis_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub igdb_client_id: Option<String>,
    pub igdb_access_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            cache_ttl: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(60),
            min_duration: 5,
            max_duration: 20,
            redis_url: None,
            openai_api_key: None,
            anthropic_api_key: None,
            youtube_api_key: None,
            igdb_client_id: None,
            igdb_access_token: None,
        }
    }
}

impl Settings {
    /// Build settings from process environment variables. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && !v.starts_with("your_"))
        };

        let settings = Self {
            model: text("GAMECRAFT_MODEL").unwrap_or(defaults.model),
            cache_ttl: parse_secs(&text, "CACHE_TTL", 3600)?,
            request_timeout: parse_secs(&text, "REQUEST_TIMEOUT", 60)?,
            min_duration: parse_or(&text, "MIN_DURATION", defaults.min_duration)?,
            max_duration: parse_or(&text, "MAX_DURATION", defaults.max_duration)?,
            redis_url: text("REDIS_URL"),
            openai_api_key: text("OPENAI_API_KEY"),
            anthropic_api_key: text("ANTHROPIC_API_KEY"),
            youtube_api_key: text("YOUTUBE_API_KEY"),
            igdb_client_id: text("IGDB_CLIENT_ID"),
            igdb_access_token: text("IGDB_ACCESS_TOKEN"),
        };

        if settings.min_duration > settings.max_duration {
            return Err(ConfigError::DurationBounds {
                min: settings.min_duration,
                max: settings.max_duration,
            });
        }

        Ok(settings)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Whole seconds in `1..=MAX_INTERVAL_SECS`.
fn parse_secs<F>(text: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(text, key, default)?;
    if secs == 0 || secs > MAX_INTERVAL_SECS {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_or<T, F>(text: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match text(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
