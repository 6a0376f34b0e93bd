//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.

/// Default server port
pub const DEFAULT_PORT: u16 = 8026;

/// Default outbound HTTP timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default LLM endpoint (OpenAI-compatible)
pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1";

/// Default LLM model
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Default LLM request timeout (seconds)
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Maximum time the orchestrator waits for all six scans (seconds)
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 90;

/// Interval between progress updates while scans run (milliseconds)
pub const DEFAULT_PROGRESS_POLL_MS: u64 = 500;

/// Interval between monitoring checks for one vendor (minutes)
pub const DEFAULT_MONITORING_INTERVAL_MINUTES: i64 = 300;

/// Maximum concurrent monitoring checks
pub const DEFAULT_MONITORING_CONCURRENCY: usize = 3;

/// How often the monitoring loop looks for due vendors (seconds)
pub const MONITORING_TICK_SECS: u64 = 60;

/// Alerts retained per monitored vendor
pub const MAX_ALERTS_PER_VENDOR: usize = 100;

/// Breach database (Have I Been Pwned public breach catalogue)
pub const BREACH_API_BASE: &str = "https://haveibeenpwned.com/api/v3";

/// Largest response body kept from a scanned page (bytes)
pub const MAX_PAGE_BYTES: usize = 512 * 1024;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Vendor Risk Server";

/// User agent sent with every outbound request
pub fn user_agent() -> String {
    format!("vendor-risk/{}", APP_VERSION)
}
