//! Application configuration management

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::graphql::pagination::PageLimits;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => bail!("unknown log format `{other}` (expected `json` or `pretty`)"),
        }
    }
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Bounds for `limit`/`first` pagination arguments
    pub page_limits: PageLimits,

    /// `EnvFilter` directives
    pub log_filter: String,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_limits: PageLimits::default(),
            log_filter: "marketplace_query=info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup; missing keys take defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let limits = defaults.page_limits;

        let page_limits = PageLimits {
            default_limit: parse_or(&var, "PAGINATION_DEFAULT_LIMIT", limits.default_limit)?,
            max_limit: parse_or(&var, "PAGINATION_MAX_LIMIT", limits.max_limit)?,
            default_first: parse_or(&var, "CONNECTION_DEFAULT_FIRST", limits.default_first)?,
            max_first: parse_or(&var, "CONNECTION_MAX_FIRST", limits.max_first)?,
        };

        if page_limits.default_limit < 1 || page_limits.default_limit > page_limits.max_limit {
            bail!("PAGINATION_DEFAULT_LIMIT must be between 1 and PAGINATION_MAX_LIMIT");
        }
        if page_limits.default_first < 1 || page_limits.default_first > page_limits.max_first {
            bail!("CONNECTION_DEFAULT_FIRST must be between 1 and CONNECTION_MAX_FIRST");
        }

        let log_format = match var("LOG_FORMAT") {
            Some(value) => value.parse::<LogFormat>().context("Invalid LOG_FORMAT")?,
            None => defaults.log_format,
        };

        Ok(Self {
            page_limits,
            log_filter: var("LOG_FILTER").unwrap_or(defaults.log_filter),
            log_format,
        })
    }
}

fn parse_or(var: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> Result<i64> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Invalid {key}: `{value}`")),
        None => Ok(default),
    }
}
