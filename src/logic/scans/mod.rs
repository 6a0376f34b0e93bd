//! Scans Module - Vendor Data Gathering
//!
//! Six independent scans, each taking a normalized vendor domain and returning
//! a typed record. A scan never fails to its caller: internal `ScanError`s are
//! converted to the record's fallback shape at the boundary.
//!
//! # Components
//! - `web.rs`: HTTP/DNS/TLS access behind the `WebClient` trait
//! - `llm.rs`: OpenAI-compatible analysis behind the `LlmClient` trait
//! - `fallback.rs`: deterministic placeholder scores
//! - `breach.rs`, `privacy.rs`, `ai_services.rs`, `compliance.rs`,
//!   `trust_center.rs`, `data_flow.rs`: the scans

pub mod ai_services;
pub mod breach;
pub mod compliance;
pub mod data_flow;
pub mod fallback;
pub mod llm;
pub mod privacy;
pub mod trust_center;
pub mod types;
pub mod web;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;

pub use ai_services::{scan_ai_services, AiServicesScan};
pub use breach::{scan_breaches, BreachScan};
pub use compliance::{canonical_framework, scan_compliance, ComplianceScan};
pub use data_flow::{scan_data_flows, DataFlowScan};
pub use llm::{DisabledLlm, LlmClient, OpenAiClient};
pub use privacy::{scan_privacy, PrivacyScan};
pub use trust_center::{scan_trust_center, TrustCenterScan};
pub use types::{AnalysisMethod, ScanError, ScanKind, ScanMeta, ScanOutcome};
pub use web::{HttpWebClient, WebClient};

// ============================================================================
// CONTEXT
// ============================================================================

/// Outbound collaborators shared by every scan
#[derive(Clone)]
pub struct ScanContext {
    pub web: Arc<dyn WebClient>,
    pub llm: Arc<dyn LlmClient>,
}

impl ScanContext {
    pub fn new(web: Arc<dyn WebClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self { web, llm }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let web = HttpWebClient::new(config.http_timeout_seconds, config.verify_tls)?;

        let llm: Arc<dyn LlmClient> = if config.llm_enabled() {
            Arc::new(OpenAiClient::new(
                &config.llm_api_url,
                config.llm_api_key.clone(),
                &config.llm_model,
                config.llm_timeout_seconds,
            )?)
        } else {
            tracing::info!("LLM_API_KEY not set, scans use keyword heuristics");
            Arc::new(DisabledLlm)
        };

        Ok(Self::new(Arc::new(web), llm))
    }
}

/// What a scan batch is pointed at
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub domain: String,
    pub vendor_name: String,
    pub regulations: Vec<String>,
}

// ============================================================================
// SINGLE SCAN
// ============================================================================

/// One finished scan, tagged by kind
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScanReport {
    Breach(BreachScan),
    Privacy(PrivacyScan),
    AiServices(AiServicesScan),
    Compliance(ComplianceScan),
    TrustCenter(TrustCenterScan),
    DataFlow(DataFlowScan),
}

impl ScanReport {
    pub fn kind(&self) -> ScanKind {
        match self {
            ScanReport::Breach(_) => ScanKind::Breach,
            ScanReport::Privacy(_) => ScanKind::Privacy,
            ScanReport::AiServices(_) => ScanKind::AiServices,
            ScanReport::Compliance(_) => ScanKind::Compliance,
            ScanReport::TrustCenter(_) => ScanKind::TrustCenter,
            ScanReport::DataFlow(_) => ScanKind::DataFlow,
        }
    }
}

/// Run one scan of the given kind
pub async fn run_scan(ctx: &ScanContext, kind: ScanKind, target: &ScanTarget) -> ScanReport {
    let domain = target.domain.as_str();
    match kind {
        ScanKind::Breach => ScanReport::Breach(scan_breaches(ctx, domain).await),
        ScanKind::Privacy => ScanReport::Privacy(scan_privacy(ctx, domain).await),
        ScanKind::AiServices => ScanReport::AiServices(scan_ai_services(ctx, domain).await),
        ScanKind::Compliance => {
            ScanReport::Compliance(scan_compliance(ctx, domain, &target.regulations).await)
        }
        ScanKind::TrustCenter => ScanReport::TrustCenter(scan_trust_center(ctx, domain).await),
        ScanKind::DataFlow => ScanReport::DataFlow(scan_data_flows(ctx, domain).await),
    }
}

// ============================================================================
// BATCH
// ============================================================================

/// Scan slots filled as tasks finish
#[derive(Debug, Default)]
pub struct PartialScans {
    breach: Option<BreachScan>,
    privacy: Option<PrivacyScan>,
    ai_services: Option<AiServicesScan>,
    compliance: Option<ComplianceScan>,
    trust_center: Option<TrustCenterScan>,
    data_flow: Option<DataFlowScan>,
}

impl PartialScans {
    pub fn insert(&mut self, report: ScanReport) {
        match report {
            ScanReport::Breach(s) => self.breach = Some(s),
            ScanReport::Privacy(s) => self.privacy = Some(s),
            ScanReport::AiServices(s) => self.ai_services = Some(s),
            ScanReport::Compliance(s) => self.compliance = Some(s),
            ScanReport::TrustCenter(s) => self.trust_center = Some(s),
            ScanReport::DataFlow(s) => self.data_flow = Some(s),
        }
    }

    pub fn has(&self, kind: ScanKind) -> bool {
        match kind {
            ScanKind::Breach => self.breach.is_some(),
            ScanKind::Privacy => self.privacy.is_some(),
            ScanKind::AiServices => self.ai_services.is_some(),
            ScanKind::Compliance => self.compliance.is_some(),
            ScanKind::TrustCenter => self.trust_center.is_some(),
            ScanKind::DataFlow => self.data_flow.is_some(),
        }
    }

    pub fn filled(&self) -> usize {
        ScanKind::ALL.iter().filter(|k| self.has(**k)).count()
    }

    /// Fill every empty slot with its fallback, using `missing_error` for the message
    pub fn complete<F>(self, target: &ScanTarget, missing_error: F) -> ScanBundle
    where
        F: Fn(ScanKind) -> ScanError,
    {
        let domain = target.domain.as_str();
        let fill = |kind: ScanKind| {
            let error = missing_error(kind);
            tracing::warn!("{} scan for {} has no result: {}", kind, domain, error);
            error.to_string()
        };

        ScanBundle {
            breach: self
                .breach
                .unwrap_or_else(|| BreachScan::fallback(domain, fill(ScanKind::Breach))),
            privacy: self
                .privacy
                .unwrap_or_else(|| PrivacyScan::fallback(domain, fill(ScanKind::Privacy))),
            ai_services: self
                .ai_services
                .unwrap_or_else(|| AiServicesScan::fallback(domain, fill(ScanKind::AiServices))),
            compliance: self.compliance.unwrap_or_else(|| {
                ComplianceScan::fallback(domain, fill(ScanKind::Compliance))
                    .finalize(&target.regulations)
            }),
            trust_center: self
                .trust_center
                .unwrap_or_else(|| TrustCenterScan::fallback(domain, fill(ScanKind::TrustCenter))),
            data_flow: self
                .data_flow
                .unwrap_or_else(|| DataFlowScan::fallback(domain, fill(ScanKind::DataFlow))),
        }
    }
}

/// All six scan records of one assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanBundle {
    pub breach: BreachScan,
    pub privacy: PrivacyScan,
    pub ai_services: AiServicesScan,
    pub compliance: ComplianceScan,
    pub trust_center: TrustCenterScan,
    pub data_flow: DataFlowScan,
}

impl ScanBundle {
    /// Kinds whose record carries an error
    pub fn failures(&self) -> Vec<ScanKind> {
        let failed = [
            (ScanKind::Breach, self.breach.is_failure()),
            (ScanKind::Privacy, self.privacy.is_failure()),
            (ScanKind::AiServices, self.ai_services.is_failure()),
            (ScanKind::Compliance, self.compliance.is_failure()),
            (ScanKind::TrustCenter, self.trust_center.is_failure()),
            (ScanKind::DataFlow, self.data_flow.is_failure()),
        ];
        failed.into_iter().filter(|(_, f)| *f).map(|(k, _)| k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::{context, FakeWeb};

    fn target() -> ScanTarget {
        ScanTarget {
            domain: "acme.com".to_string(),
            vendor_name: "Acme".to_string(),
            regulations: vec!["SOC 2".to_string()],
        }
    }

    fn error_of(report: &ScanReport) -> Option<&str> {
        let meta = match report {
            ScanReport::Breach(s) => s.meta(),
            ScanReport::Privacy(s) => s.meta(),
            ScanReport::AiServices(s) => s.meta(),
            ScanReport::Compliance(s) => s.meta(),
            ScanReport::TrustCenter(s) => s.meta(),
            ScanReport::DataFlow(s) => s.meta(),
        };
        meta.error.as_deref()
    }

    #[tokio::test]
    async fn test_run_scan_dispatch() {
        let ctx = context(FakeWeb::offline());
        for kind in ScanKind::ALL {
            let report = run_scan(&ctx, kind, &target()).await;
            assert_eq!(report.kind(), kind);
            assert!(error_of(&report).is_some(), "{} should fail offline", kind);
        }
    }

    #[test]
    fn test_partial_scans_fill_missing() {
        let mut partial = PartialScans::default();
        partial.insert(ScanReport::Breach(BreachScan::fallback("acme.com", "down".into())));
        assert_eq!(partial.filled(), 1);
        assert!(partial.has(ScanKind::Breach));
        assert!(!partial.has(ScanKind::Privacy));

        let bundle = partial.complete(&target(), |_| ScanError::TimedOut { seconds: 5.0 });
        assert_eq!(bundle.breach.meta.error.as_deref(), Some("down"));
        assert_eq!(
            bundle.privacy.meta.error.as_deref(),
            Some("Scan did not finish within 5s")
        );
        assert_eq!(bundle.compliance.frameworks_requested, vec!["SOC 2".to_string()]);
        assert_eq!(bundle.failures().len(), 6);
    }
}
