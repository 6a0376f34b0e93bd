//! Scan Types
//!
//! Shared header, error and outcome types for the six vendor scans.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SCAN KIND
// ============================================================================

/// The six independent vendor scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    Breach,
    Privacy,
    AiServices,
    Compliance,
    TrustCenter,
    DataFlow,
}

impl ScanKind {
    pub const ALL: [ScanKind; 6] = [
        ScanKind::Breach,
        ScanKind::Privacy,
        ScanKind::AiServices,
        ScanKind::Compliance,
        ScanKind::TrustCenter,
        ScanKind::DataFlow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Breach => "breach",
            ScanKind::Privacy => "privacy",
            ScanKind::AiServices => "ai_services",
            ScanKind::Compliance => "compliance",
            ScanKind::TrustCenter => "trust_center",
            ScanKind::DataFlow => "data_flow",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "breach" | "breaches" => Ok(ScanKind::Breach),
            "privacy" => Ok(ScanKind::Privacy),
            "ai" | "ai_services" => Ok(ScanKind::AiServices),
            "compliance" => Ok(ScanKind::Compliance),
            "trust_center" | "trust" => Ok(ScanKind::TrustCenter),
            "data_flow" | "data_flows" => Ok(ScanKind::DataFlow),
            other => Err(format!("Unknown scan kind: {}", other)),
        }
    }
}

// ============================================================================
// COMMON HEADER
// ============================================================================

/// Fields every scan record carries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMeta {
    pub vendor_domain: String,
    pub scan_date: DateTime<Utc>,
    /// Present only when the scan failed and fallback values were used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanMeta {
    pub fn ok(domain: &str) -> Self {
        Self {
            vendor_domain: domain.to_string(),
            scan_date: Utc::now(),
            error: None,
        }
    }

    pub fn failed(domain: &str, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::ok(domain)
        }
    }
}

/// How a scan arrived at its numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    /// LLM analysis of fetched content
    Llm,
    /// Keyword heuristics over fetched content
    Keyword,
    /// Deterministic placeholder derived from the domain
    Synthetic,
    /// Nothing ran (scan failed)
    None,
}

// ============================================================================
// ERRORS
// ============================================================================

/// Scan-level failure. Never leaves a scan boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("DNS resolution failed for {domain}: {message}")]
    Dns { domain: String, message: String },

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Could not parse response from {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("{domain} is unreachable: no candidate page answered")]
    Unreachable { domain: String },

    #[error("LLM analysis unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Scan did not finish within {seconds}s")]
    TimedOut { seconds: f64 },

    #[error("Scan task failed: {0}")]
    TaskFailed(String),
}

// ============================================================================
// OUTCOME CONTRACT
// ============================================================================

/// A scan record with a documented fallback shape
pub trait ScanOutcome: Sized + Send + 'static {
    const KIND: ScanKind;

    /// Default-valued record carrying `error`
    fn fallback(domain: &str, error: String) -> Self;

    fn meta(&self) -> &ScanMeta;

    fn is_failure(&self) -> bool {
        self.meta().error.is_some()
    }
}

/// Convert an internal scan result into the never-fails boundary value
pub fn settle<T: ScanOutcome>(domain: &str, outcome: Result<T, ScanError>) -> T {
    match outcome {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("{} scan failed for {}: {}", T::KIND, domain, e);
            T::fallback(domain, e.to_string())
        }
    }
}
