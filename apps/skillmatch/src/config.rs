use std::time::Duration;

use anyhow::{Context, Result};

use crate::skills::normalizer::DEFAULT_MAX_PER_CATEGORY;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MATCHER_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
/// Fails at startup if a set variable cannot be parsed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent → the external matcher is disabled.
    pub anthropic_api_key: Option<String>,
    pub enable_external_matcher: bool,
    pub matcher_timeout: Duration,
    pub max_skills_per_category: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value lookup.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parsed = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            anthropic_api_key: get("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()),
            enable_external_matcher: parse_bool(&parsed("ENABLE_EXTERNAL_MATCHER", "true"))
                .context("ENABLE_EXTERNAL_MATCHER must be true or false")?,
            matcher_timeout: Duration::from_secs(
                parsed("MATCHER_TIMEOUT_SECS", &DEFAULT_MATCHER_TIMEOUT_SECS.to_string())
                    .parse::<u64>()
                    .context("MATCHER_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_skills_per_category: parsed(
                "MAX_SKILLS_PER_CATEGORY",
                &DEFAULT_MAX_PER_CATEGORY.to_string(),
            )
            .parse::<usize>()
            .context("MAX_SKILLS_PER_CATEGORY must be a positive integer")?,
            port: parsed("PORT", &DEFAULT_PORT.to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: parsed("RUST_LOG", "info"),
        })
    }

    /// The external matcher runs only when enabled and a key is configured.
    pub fn external_matcher_key(&self) -> Option<&str> {
        self.anthropic_api_key
            .as_deref()
            .filter(|_| self.enable_external_matcher)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("invalid boolean '{other}'"),
    }
}
