use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

/// Upper bound for every `*_SECS` setting (one day).
const MAX_SECS: u64 = 24 * 60 * 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Enables the form schema cache when set.
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub analyze_timeout: Duration,
    pub submit_timeout: Duration,
    pub schema_cache_ttl: Duration,
    /// Overrides the built-in synonym table.
    pub synonyms_path: Option<PathBuf>,
    pub http_submission_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: var("DATABASE_URL").with_context(|| {
                "Required environment variable 'DATABASE_URL' is not set".to_string()
            })?,
            redis_url: var("REDIS_URL"),
            port: parse_or(var("PORT"), "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            analyze_timeout: seconds(var("ANALYZE_TIMEOUT_SECS"), "ANALYZE_TIMEOUT_SECS", 30)?,
            submit_timeout: seconds(var("SUBMIT_TIMEOUT_SECS"), "SUBMIT_TIMEOUT_SECS", 120)?,
            schema_cache_ttl: seconds(var("SCHEMA_CACHE_TTL_SECS"), "SCHEMA_CACHE_TTL_SECS", 600)?,
            synonyms_path: var("SYNONYMS_PATH").map(PathBuf::from),
            http_submission_enabled: parse_or(
                var("HTTP_SUBMISSION_ENABLED"),
                "HTTP_SUBMISSION_ENABLED",
                false,
            )?,
        })
    }
}

fn seconds(raw: Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = parse_or(raw, key, default)?;
    ensure!(
        (1..=MAX_SECS).contains(&secs),
        "{key} must be between 1 and {MAX_SECS} seconds, got {secs}"
    );
    Ok(Duration::from_secs(secs))
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
