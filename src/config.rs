//! Configuration module

use std::env;
use std::time::Duration;

use crate::constants;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Outbound HTTP timeout in seconds
    pub http_timeout_seconds: u64,

    /// Verify TLS certificates when fetching vendor pages
    pub verify_tls: bool,

    /// OpenAI-compatible API base URL
    pub llm_api_url: String,

    /// LLM API key (analysis disabled when missing)
    pub llm_api_key: Option<String>,

    /// LLM model name
    pub llm_model: String,

    /// LLM request timeout in seconds
    pub llm_timeout_seconds: u64,

    /// Bounded wait for the parallel scan join, in seconds
    pub scan_timeout_seconds: u64,

    /// Progress poll interval in milliseconds
    pub progress_poll_ms: u64,

    /// Minutes between monitoring checks of one vendor
    pub monitoring_interval_minutes: i64,

    /// Maximum concurrent monitoring checks
    pub monitoring_concurrency: usize,

    /// Log output format ("json" or "pretty")
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: parse_var("PORT").unwrap_or(constants::DEFAULT_PORT),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            http_timeout_seconds: parse_var("HTTP_TIMEOUT_SECONDS")
                .unwrap_or(constants::DEFAULT_HTTP_TIMEOUT_SECS),

            verify_tls: parse_var("VERIFY_TLS").unwrap_or(true),

            llm_api_url: env::var("LLM_API_URL")
                .unwrap_or_else(|_| constants::DEFAULT_LLM_API_URL.to_string()),

            llm_api_key: env::var("LLM_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),

            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| constants::DEFAULT_LLM_MODEL.to_string()),

            llm_timeout_seconds: parse_var("LLM_TIMEOUT_SECONDS")
                .unwrap_or(constants::DEFAULT_LLM_TIMEOUT_SECS),

            scan_timeout_seconds: parse_var("SCAN_TIMEOUT_SECONDS")
                .unwrap_or(constants::DEFAULT_SCAN_TIMEOUT_SECS),

            progress_poll_ms: parse_var("PROGRESS_POLL_MS")
                .unwrap_or(constants::DEFAULT_PROGRESS_POLL_MS),

            monitoring_interval_minutes: parse_var("MONITORING_INTERVAL_MINUTES")
                .unwrap_or(constants::DEFAULT_MONITORING_INTERVAL_MINUTES),

            monitoring_concurrency: parse_var("MONITORING_CONCURRENCY")
                .unwrap_or(constants::DEFAULT_MONITORING_CONCURRENCY),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if an LLM is configured
    pub fn llm_enabled(&self) -> bool {
        self.llm_api_key.is_some()
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_seconds)
    }

    pub fn progress_poll_interval(&self) -> Duration {
        Duration::from_millis(self.progress_poll_ms.max(10))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
